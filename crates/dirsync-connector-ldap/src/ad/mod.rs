//! Active Directory specific helpers
//!
//! - userAccountControl bitfield handling
//! - directory-native (FILETIME) timestamp conversion
//! - `unicodePwd` encoding and initial password generation

pub mod filetime;
pub mod password;
pub mod user_account_control;

pub use filetime::{datetime_to_filetime, filetime_to_datetime, NEVER_EXPIRES};
pub use password::{encode_ad_password, generate_password, validate_password_connection};
pub use user_account_control::UserAccountControl;
