pub mod gate;
pub mod rbac;
pub mod scope;
pub mod store;

pub use gate::{require_super_admin, with_scoped_permission, Grant};
pub use rbac::{Action, GlobalRole, MemberRole, Resource};
pub use scope::{authorize_org, authorize_record, owning_organization, Owned};
