/*
 * Responsibility
 * - middleware の公開インターフェース
 * - http: 全ルート共通 (request-id / trace / limit / timeout)
 * - relying_party: エンドポイント単位の Bearer 認可
 */
pub mod http;
pub mod relying_party;
