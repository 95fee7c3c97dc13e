/*!
 * Bearer token verification and role authorization
 *
 * Responsibility:
 * - Authorization ヘッダの形式チェック (credential)
 * - HMAC JWT の署名・期限の検証 (verifier)
 * - user_id / user_role の抽出 (claims)
 * - エンドポイント単位のロール許可リスト (policy)
 *
 * Router / middleware には依存しない (ヘッダ型として axum::http のみ使う)。
 * レスポンスへの変換とリクエストへの反映は middleware 側の責務。
 */

pub mod claims;
pub mod credential;
pub mod policy;
pub mod verifier;

pub use claims::{Identity, USER_ID_HEADER};
pub use credential::parse_bearer;
pub use policy::{Access, EndpointAuthConfig};
pub use verifier::{ClaimSet, SharedSecret, TokenVerifier};
