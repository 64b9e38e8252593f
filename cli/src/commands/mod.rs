mod activity;
mod auth;
mod food;
mod goals;
mod helpers;
mod log;
mod profile;
mod search;
mod summary;
mod sync;

pub(crate) use activity::{cmd_activity_delete, cmd_activity_list, cmd_activity_log};
pub(crate) use auth::{cmd_auth_guest, cmd_auth_login, cmd_auth_logout, cmd_auth_status};
pub(crate) use food::{
    cmd_food_add, cmd_food_delete, cmd_food_favorite, cmd_food_list, cmd_food_today,
};
pub(crate) use goals::{cmd_goals_set, cmd_goals_show};
pub(crate) use log::{cmd_barcode, cmd_log};
pub(crate) use profile::{cmd_profile_set, cmd_profile_show};
pub(crate) use search::cmd_search;
pub(crate) use summary::cmd_summary;
pub(crate) use sync::{
    cmd_remote_set, cmd_remote_show, cmd_sync_daemon, cmd_sync_now, cmd_sync_pull, cmd_sync_push,
    cmd_sync_status,
};
