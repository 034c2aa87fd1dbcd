//! Route paths.

// Management service
pub const POST_AUTH_LOGIN: &str = "/api/v1/auth/login";
pub const GET_USERS_ME: &str = "/api/v1/users/me";
pub const GET_ROLES_ALL: &str = "/api/v1/roles/all";
pub const USER_ROLES: &str = "/api/v1/users/{user_id}/roles";

// User application
pub const GET_USER_LOGIN: &str = "/v1/user/login";
pub const GET_USER_CAS_LOGIN_URL: &str = "/v1/user/cas_login_url";
pub const GET_USER_CAS_CALLBACK: &str = ragmin_core::sso::CALLBACK_PATH;
pub const GET_USER_LOGOUT: &str = "/v1/user/logout";
pub const POST_USER_SETTING: &str = "/v1/user/setting";
pub const GET_USER_INFO: &str = "/v1/user/info";
pub const GET_USER_TENANT_INFO: &str = "/v1/user/tenant_info";
pub const POST_USER_SET_TENANT_INFO: &str = "/v1/user/set_tenant_info";
