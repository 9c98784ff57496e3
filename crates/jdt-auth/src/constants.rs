//! Gateway login constants

/// First login step: exchanges the app id for a one-time authorization code.
pub const AUTHORIZE_PATH: &str = "/no/authentication/login/authorize";

/// Second login step: exchanges the authorization code for an access token.
pub const TOKEN_PATH: &str = "/no/authentication/login/token";

/// A cached token with this many seconds or fewer left is treated as expired.
pub const REFRESH_SKEW_SECS: i64 = 300;

/// Envelope message for a successful token lookup or refresh.
pub const LOGIN_SUCCESS_MESSAGE: &str = "登录成功";
