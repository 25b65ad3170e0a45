//! One handler per order type.

pub mod disable;
pub mod password;
pub mod register;
pub mod renew;

use std::sync::Arc;

use dirsync_connector::traits::DirectoryOps;

use crate::account;
use crate::context::SyncContext;
use crate::error::{SyncError, SyncResult};
use crate::model::DirectoryUser;
use crate::notify::Notifier;
use crate::orders::form::Form;
use crate::platforms::PlatformProvisioner;

/// Form field keys, matched against control id or name.
pub mod fields {
    pub const APPLICANTS: &[&str] = &["applicants", "申请人"];
    pub const NAME: &[&str] = &["name", "display_name", "姓名"];
    pub const EMPLOYEE_ID: &[&str] = &["employee_id", "employeeID", "工号"];
    pub const COMPANY: &[&str] = &["company", "公司"];
    pub const DEPARTMENT: &[&str] = &["department", "部门"];
    pub const EMAIL: &[&str] = &["email", "mail", "邮箱"];
    pub const PHONE: &[&str] = &["phone", "mobile", "手机"];
    pub const TITLE: &[&str] = &["title", "职位"];
    pub const PLATFORMS: &[&str] = &["platforms", "平台"];
    pub const LOGIN: &[&str] = &["login", "account", "账号"];
    pub const EXPIRE_DATE: &[&str] = &["expire_date", "expires", "到期日期"];
}

/// Collaborators the handlers write through.
#[derive(Clone)]
pub struct OrderServices {
    pub ctx: Arc<SyncContext>,
    pub directory: Arc<dyn DirectoryOps>,
    pub notifier: Arc<dyn Notifier>,
    pub platforms: Arc<dyn PlatformProvisioner>,
}

/// The account an order targets, by login or else employee id.
pub(crate) async fn resolve_account(
    services: &OrderServices,
    form: &Form,
) -> SyncResult<DirectoryUser> {
    let directory = services.directory.as_ref();
    if let Some(login) = form.text(fields::LOGIN) {
        return account::find_by_login(directory, &services.ctx, login).await;
    }
    if let Some(employee_id) = form.text(fields::EMPLOYEE_ID) {
        return account::find_by_employee_id(directory, &services.ctx, employee_id).await;
    }
    Err(SyncError::validation("account", "order names no login or employee id"))
}
