// Public API - what other modules can use
pub use handlers::{login, register, renew_access_token, update_nickname};
pub use middleware::bearer_auth;
pub use service::{AuthConfig, AuthService};
pub use types::{
    ClientInfo, LoginRequest, LoginResponse, RegisterRequest, RenewAccessTokenRequest,
    RenewAccessTokenResponse, UpdateNicknameRequest, UserResponse,
};

// Internal modules
mod handlers;
mod middleware;
mod password;
mod service;
mod types;
