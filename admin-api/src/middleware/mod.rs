mod access;

pub use access::{
    load_access, require_admin_interface, require_admin_or_member, require_election_manager,
    require_login, CurrentAccess, SessionHandle,
};
