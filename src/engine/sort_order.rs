//! Deploy order of the built-in commands. Lower runs first; undo is the reverse.

pub const DEPLOY_GROUPS: i32 = 5;
pub const DEPLOY_ROLES: i32 = 10;
pub const DEPLOY_PRIVILEGES: i32 = 15;
pub const DEPLOY_CERTIFICATE_TEMPLATES: i32 = 20;
pub const DEPLOY_USERS: i32 = 30;
pub const DEPLOY_AMPS: i32 = 40;
pub const DEPLOY_DATABASES: i32 = 100;
pub const DEPLOY_REST_APIS: i32 = 200;
/// Right before the REST API servers
pub const LOAD_MODULES: i32 = DEPLOY_REST_APIS - 10;
pub const DEPLOY_SERVERS: i32 = 250;
pub const LOAD_SCHEMAS: i32 = 350;
pub const DEPLOY_TRIGGERS: i32 = 700;
pub const DEPLOY_FLEXREP_CONFIGS: i32 = 800;
pub const DEPLOY_FLEXREP_TARGETS: i32 = 810;
pub const DEPLOY_ALERT_CONFIGS: i32 = 900;
