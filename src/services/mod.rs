/*
 * Responsibility
 * - ドメインロジック (HTTP 非依存)
 */
pub mod auth;
