//! The static Guepard tool catalog.
//!
//! One entry per platform endpoint plus the locally handled subscription and
//! configuration tools. Built once at startup; see [`builtin_registry`].

use crate::tools::catalog::{ParamDef, ParamType, ToolDescriptor, ToolRegistry};
use crate::types::Result;

/// Module that owns the locally handled configuration tools.
pub const CONFIGURATION_MODULE: &str = "configuration";
/// Module that owns the locally handled subscription tools.
pub const SUBSCRIPTIONS_MODULE: &str = "subscriptions";

/// Required string parameter.
fn s(name: &str, description: &str) -> ParamDef {
    ParamDef::required(name, ParamType::String, description)
}

/// Optional parameter.
fn opt(name: &str, param_type: ParamType, description: &str) -> ParamDef {
    ParamDef::optional(name, param_type, description)
}

fn deployment_id() -> ParamDef {
    s("deployment_id", "Deployment ID")
}

fn branch_id() -> ParamDef {
    s("branch_id", "Branch ID")
}

fn snapshot_id() -> ParamDef {
    s("snapshot_id", "Snapshot ID")
}

fn username() -> ParamDef {
    s("username", "Database username")
}

fn privileges() -> ParamDef {
    ParamDef::required("privileges", ParamType::StringList, "Privileges to apply")
}

fn auth() -> Vec<ToolDescriptor> {
    let m = "auth";
    vec![
        ToolDescriptor::new("start_login", m, "Start the login process with a third-party provider")
            .param(opt("provider", ParamType::String, "Identity provider"))
            .param(s("redirect_url", "Redirect URL after login")),
        ToolDescriptor::new("resume_login", m, "Resume the login process with authorization code")
            .param(s("state", "Login state"))
            .param(s("code", "Authorization code")),
        ToolDescriptor::new("verify_session", m, "Verify the current session and get access token")
            .param(s("session_id", "Session ID")),
        ToolDescriptor::new("end_login", m, "End the login process")
            .param(s("session_id", "Session ID")),
        ToolDescriptor::new(
            "login_supabase",
            m,
            "Login with Supabase authentication to get access and refresh tokens",
        )
        .param(s("email", "Account email"))
        .param(s("password", "Account password")),
        ToolDescriptor::new("refresh_token_supabase", m, "Refresh access token using refresh token")
            .param(s("refresh_token", "Refresh token")),
        ToolDescriptor::new("logout_supabase", m, "Logout and invalidate tokens")
            .param(s("refresh_token", "Refresh token")),
    ]
}

fn deployments() -> Vec<ToolDescriptor> {
    let m = "deployments";
    vec![
        ToolDescriptor::new("list_deployments", m, "Get all deployments")
            .param(opt("status", ParamType::String, "Filter by status"))
            .param(opt("limit", ParamType::Int, "Maximum number of deployments")),
        ToolDescriptor::new("create_deployment", m, "Create a new database deployment")
            .param(s("repository_name", "Repository name"))
            .param(s("performance_profile_id", "Performance profile ID"))
            .param(opt("name", ParamType::String, "Deployment name"))
            .param(opt(
                "database_provider",
                ParamType::Enum(vec![
                    "PostgreSQL".to_string(),
                    "mysql".to_string(),
                    "mongodb".to_string(),
                ]),
                "Database provider",
            ))
            .param(opt("database_version", ParamType::String, "Database version"))
            .param(opt(
                "deployment_type",
                ParamType::Enum(vec!["REPOSITORY".to_string(), "F2".to_string()]),
                "Type of deployment",
            ))
            .auto_subscribe(true),
        ToolDescriptor::new("get_deployment", m, "Get deployment details")
            .param(deployment_id())
            .auto_subscribe(true),
        ToolDescriptor::new("update_deployment", m, "Update deployment")
            .param(deployment_id())
            .param(opt("name", ParamType::String, "Deployment name")),
        ToolDescriptor::new("delete_deployment", m, "Delete deployment").param(deployment_id()),
    ]
}

fn branches() -> Vec<ToolDescriptor> {
    let m = "branches";
    vec![
        ToolDescriptor::new("list_branches", m, "Get all branches for a deployment")
            .param(deployment_id()),
        ToolDescriptor::new("update_branch", m, "Update branch configuration")
            .param(deployment_id())
            .param(branch_id())
            .param(opt("label_name", ParamType::String, "Branch label"))
            .param(opt("is_ephemeral", ParamType::Bool, "Ephemeral branch")),
        ToolDescriptor::new(
            "create_branch_from_snapshot",
            m,
            "Create a new branch from a specific snapshot",
        )
        .param(deployment_id())
        .param(branch_id())
        .param(snapshot_id())
        .param(s("branch_name", "New branch name"))
        .param(opt("is_ephemeral", ParamType::Bool, "Ephemeral branch"))
        .auto_subscribe(true),
    ]
}

fn snapshots() -> Vec<ToolDescriptor> {
    let m = "snapshots";
    vec![
        ToolDescriptor::new("create_snapshot", m, "Create a snapshot")
            .param(deployment_id())
            .param(branch_id())
            .param(s("snapshot_comment", "Snapshot comment"))
            .auto_subscribe(true),
        ToolDescriptor::new("list_snapshots_deployment", m, "Get snapshots for deployment")
            .param(deployment_id()),
        ToolDescriptor::new("list_snapshots_branch", m, "Get snapshots for branch")
            .param(deployment_id())
            .param(branch_id()),
        ToolDescriptor::new("create_bookmark", m, "Create a bookmark for a specific deployment")
            .param(deployment_id())
            .param(branch_id())
            .param(s("snapshot_comment", "Bookmark comment")),
    ]
}

fn nodes() -> Vec<ToolDescriptor> {
    let m = "nodes";
    vec![
        ToolDescriptor::new("list_nodes", m, "Get all available compute nodes"),
        ToolDescriptor::new(
            "list_accessible_nodes",
            m,
            "Get nodes accessible to the authenticated user",
        ),
        ToolDescriptor::new("create_node", m, "Create a new compute node")
            .param(s("label_name", "Node label"))
            .param(s("node_type", "Node type"))
            .param(s("datacenter", "Datacenter"))
            .param(s("region", "Region"))
            .param(s("hosting_provider", "Hosting provider"))
            .param(ParamDef::required("memory", ParamType::Int, "Memory (GB)"))
            .param(ParamDef::required("cpu", ParamType::Int, "CPU cores"))
            .param(ParamDef::required("storage", ParamType::Int, "Storage (GB)"))
            .auto_subscribe(true),
        ToolDescriptor::new("get_node", m, "Get detailed information about a specific node")
            .param(s("node_id", "Node ID")),
    ]
}

fn performance() -> Vec<ToolDescriptor> {
    let m = "performance";
    vec![
        ToolDescriptor::new(
            "list_performance_profiles",
            m,
            "Get all available performance profiles",
        ),
        ToolDescriptor::new("create_performance_profile", m, "Create a new performance profile")
            .param(s("label_name", "Profile label"))
            .param(s("description_text", "Profile description"))
            .param(ParamDef::required("min_cpu", ParamType::Int, "Minimum CPU"))
            .param(ParamDef::required("min_memory", ParamType::Int, "Minimum memory"))
            .param(opt("config_flags", ParamType::Object, "Database configuration flags")),
        ToolDescriptor::new(
            "update_performance_profile",
            m,
            "Update an existing performance profile",
        )
        .param(s("profile_id", "Profile ID")),
        ToolDescriptor::new(
            "apply_performance_profile",
            m,
            "Apply a performance profile to a deployment",
        )
        .param(deployment_id())
        .param(s("performance_profile_id", "Performance profile ID")),
    ]
}

fn compute() -> Vec<ToolDescriptor> {
    let m = "compute";
    vec![
        ToolDescriptor::new("get_compute_status", m, "Get compute status").param(deployment_id()),
        ToolDescriptor::new("start_compute", m, "Start compute for a specific deployment")
            .param(deployment_id())
            .param(opt("notify", ParamType::Bool, "Send a notification"))
            .auto_subscribe(true),
        ToolDescriptor::new("stop_compute", m, "Stop compute for a specific deployment")
            .param(deployment_id())
            .param(opt("notify", ParamType::Bool, "Send a notification")),
        ToolDescriptor::new("get_deployment_status", m, "Get deployment status")
            .param(deployment_id()),
    ]
}

fn users() -> Vec<ToolDescriptor> {
    let m = "users";
    vec![
        ToolDescriptor::new("list_database_users", m, "Get database users for deployment")
            .param(deployment_id()),
        ToolDescriptor::new(
            "batch_create_database_users",
            m,
            "Create multiple database users at once",
        )
        .param(deployment_id()),
        ToolDescriptor::new("create_database_user", m, "Create a new database user")
            .param(deployment_id())
            .param(username())
            .param(s("password", "Password")),
        ToolDescriptor::new("update_database_user", m, "Update database user")
            .param(deployment_id())
            .param(username()),
        ToolDescriptor::new("delete_database_user", m, "Delete database user")
            .param(deployment_id())
            .param(username()),
        ToolDescriptor::new("grant_privileges", m, "Grant privileges to database user")
            .param(deployment_id())
            .param(username())
            .param(privileges()),
        ToolDescriptor::new("revoke_privileges", m, "Revoke privileges from database user")
            .param(deployment_id())
            .param(username())
            .param(privileges()),
        ToolDescriptor::new("list_user_privileges", m, "List privileges for database user")
            .param(deployment_id())
            .param(username()),
    ]
}

fn tokens() -> Vec<ToolDescriptor> {
    let m = "tokens";
    vec![
        ToolDescriptor::new("list_tokens", m, "Get all tokens"),
        ToolDescriptor::new("generate_token", m, "Generate new token")
            .param(s("name", "Token name"))
            .param(opt("expires_in", ParamType::Int, "Lifetime in seconds")),
        ToolDescriptor::new("revoke_token", m, "Revoke token").param(s("token_id", "Token ID")),
    ]
}

fn small_modules() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new("list_f2_deployments", "f2_deployments", "Get all F2 deployments"),
        ToolDescriptor::new(
            "list_image_providers",
            "image_providers",
            "Get all available database image providers",
        ),
        ToolDescriptor::new(
            "get_usage_statistics",
            "usage",
            "Get usage statistics for the authenticated user",
        ),
        ToolDescriptor::new("update_resources", "usage", "Update resource quotas and limits"),
        ToolDescriptor::new(
            "get_deployment_logs",
            "logs",
            "Get deployment logs for monitoring and debugging",
        )
        .param(deployment_id())
        .param(opt("lines", ParamType::Int, "Number of log lines")),
        ToolDescriptor::new(
            "get_deployment_metrics",
            "logs",
            "Get deployment metrics and performance data",
        )
        .param(deployment_id())
        .param(opt("time_range", ParamType::String, "Time range, e.g. 1h")),
    ]
}

fn checkouts() -> Vec<ToolDescriptor> {
    let m = "checkouts";
    vec![
        ToolDescriptor::new("checkout_branch", m, "Checkout to a specific branch with snapshot")
            .param(deployment_id())
            .param(branch_id())
            .param(snapshot_id())
            .auto_subscribe(true),
        ToolDescriptor::new("checkout_snapshot", m, "Checkout a snapshot of a deployment")
            .param(opt("deployment_id", ParamType::String, "Deployment ID"))
            .param(opt("ephemeral", ParamType::Bool, "Ephemeral checkout"))
            .auto_subscribe(true),
    ]
}

fn shadows() -> Vec<ToolDescriptor> {
    let m = "shadows";
    vec![
        ToolDescriptor::new(
            "list_shadows_for_deployment",
            m,
            "List shadow deployments for a specific deployment",
        )
        .param(deployment_id()),
        ToolDescriptor::new("list_all_shadows", m, "List all shadow deployments"),
        ToolDescriptor::new("create_shadow", m, "Create a new shadow deployment")
            .param(deployment_id())
            .param(s("name", "Shadow name"))
            .param(snapshot_id()),
    ]
}

fn schema() -> Vec<ToolDescriptor> {
    let m = "schema";
    vec![
        ToolDescriptor::new("extract_schema", m, "Extract database schema from a branch")
            .param(deployment_id())
            .param(branch_id()),
        ToolDescriptor::new("update_schema", m, "Update database schema")
            .param(deployment_id())
            .param(branch_id())
            .param(ParamDef::required("schema", ParamType::Object, "Schema definition")),
        ToolDescriptor::new("get_snapshot_schema", m, "Get schema from a specific snapshot")
            .param(deployment_id())
            .param(snapshot_id()),
    ]
}

fn subscriptions() -> Vec<ToolDescriptor> {
    let m = SUBSCRIPTIONS_MODULE;
    vec![
        ToolDescriptor::new("subscribe_deployment", m, "Subscribe to deployment notifications")
            .param(s("deployment_id", "Deployment ID to subscribe to")),
        ToolDescriptor::new(
            "unsubscribe_deployment",
            m,
            "Unsubscribe from deployment notifications",
        )
        .param(s("deployment_id", "Deployment ID to unsubscribe from")),
        ToolDescriptor::new(
            "list_subscriptions",
            m,
            "List all deployment subscriptions with optional status information",
        )
        .param(
            opt("include_status", ParamType::Bool, "Include deployment status information")
                .with_default(serde_json::json!(false)),
        )
        .param(
            opt(
                "include_compute_status",
                ParamType::Bool,
                "Include compute status information (requires include_status=true)",
            )
            .with_default(serde_json::json!(false)),
        ),
        // `action` stays a plain string so an unrecognized value reaches the
        // handler and is reported as an unknown action.
        ToolDescriptor::new(
            "manage_subscriptions",
            m,
            "Manage automatic subscription settings and view current subscriptions",
        )
        .param(s(
            "action",
            "Action to perform: status, enable, disable, configure, clear_all, unsubscribe",
        ))
        .param(opt("tool_name", ParamType::String, "Tool name for the configure action"))
        .param(opt(
            "deployment_id",
            ParamType::String,
            "Deployment ID for the unsubscribe action",
        ))
        .param(opt("enabled", ParamType::Bool, "Enable/disable auto-subscription")),
        ToolDescriptor::new("test_connection", m, "Test connection to Guepard API"),
    ]
}

fn configuration() -> Vec<ToolDescriptor> {
    let m = CONFIGURATION_MODULE;
    vec![
        ToolDescriptor::new("list_configurations", m, "List available predefined configurations"),
        ToolDescriptor::new("get_configuration", m, "Get current server configuration"),
        ToolDescriptor::new(
            "reload_configuration",
            m,
            "Re-read tool activation settings from the environment",
        ),
    ]
}

/// Build the full Guepard registry.
pub fn builtin_registry() -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    let groups = [
        auth(),
        deployments(),
        branches(),
        snapshots(),
        nodes(),
        performance(),
        compute(),
        users(),
        tokens(),
        small_modules(),
        checkouts(),
        shadows(),
        schema(),
        subscriptions(),
        configuration(),
    ];
    for tool in groups.into_iter().flatten() {
        registry.register(tool)?;
    }
    Ok(registry)
}
