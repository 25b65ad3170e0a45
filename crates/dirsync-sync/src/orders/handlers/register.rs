//! Account registration.
//!
//! One order may carry several applicants, each requesting a set of
//! platforms. Every applicant is handled independently; applicants whose
//! directory login already exists are not created again, so a retried order
//! only does the work that failed the first time.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument, warn};

use dirsync_connector::dn::Rdn;
use dirsync_connector::operation::AttributeSet;
use dirsync_connector_ldap::ad::{
    datetime_to_filetime, encode_ad_password, generate_password, UserAccountControl, NEVER_EXPIRES,
};

use super::{fields, OrderServices};
use crate::account;
use crate::company::CompanyType;
use crate::context::SyncContext;
use crate::error::{SyncError, SyncResult};
use crate::model::attr;
use crate::orders::form::{Form, OrderDetail};
use crate::orders::types::Applicant;
use crate::ou_path;
use crate::platforms::PlatformSpec;

/// Longest `sAMAccountName` Active Directory accepts.
const MAX_LOGIN_LEN: usize = 20;

/// Applicants listed in the order's table, or the order itself as one applicant.
pub fn applicants(form: &Form) -> Vec<Applicant> {
    let rows = form.table(fields::APPLICANTS);
    if rows.is_empty() {
        vec![applicant_from(form)]
    } else {
        rows.iter().map(applicant_from).collect()
    }
}

fn applicant_from(form: &Form) -> Applicant {
    let text = |keys: &[&str]| form.text(keys).unwrap_or_default().to_string();
    Applicant {
        name: text(fields::NAME),
        employee_id: text(fields::EMPLOYEE_ID),
        company: text(fields::COMPANY),
        department: text(fields::DEPARTMENT),
        email: text(fields::EMAIL),
        phone: text(fields::PHONE),
        title: text(fields::TITLE),
        platforms: form.multi_select(fields::PLATFORMS),
    }
}

/// 7 to 15 digits with an optional leading `+`. Spaces and dashes are ignored.
pub fn validate_phone(phone: &str) -> SyncResult<()> {
    let compact: String = phone.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    let digits = compact.strip_prefix('+').unwrap_or(&compact);
    let ok = (7..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit());
    if ok {
        Ok(())
    } else {
        Err(SyncError::validation("phone", format!("'{phone}' is not a phone number")))
    }
}

/// `local@domain.tld` with no spaces; returns the local part.
pub fn validate_email(email: &str) -> SyncResult<&str> {
    let invalid = || SyncError::validation("email", format!("'{email}' is not an email address"));
    let (local, domain) = email.trim().split_once('@').ok_or_else(invalid)?;
    let well_formed = !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.trim().contains(char::is_whitespace);
    if well_formed {
        Ok(local)
    } else {
        Err(invalid())
    }
}

/// Directory login for an applicant: prefix plus the lowercased email local part.
pub fn login_for(prefix: &str, email_local: &str) -> SyncResult<String> {
    let login = format!("{prefix}{}", email_local.to_lowercase());
    let valid_chars = login
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if !valid_chars {
        return Err(SyncError::validation(
            "login",
            format!("'{login}' contains characters not allowed in a login"),
        ));
    }
    if login.len() > MAX_LOGIN_LEN {
        return Err(SyncError::validation(
            "login",
            format!("'{login}' is longer than {MAX_LOGIN_LEN} characters"),
        ));
    }
    Ok(login)
}

/// Container for a new account.
pub fn container_for(ctx: &SyncContext, company: &CompanyType, applicant: &Applicant) -> String {
    let department = applicant.department.trim();
    if !company.is_external {
        return if ou_path::department_tokens(department).is_empty() {
            ctx.default_ou().to_string()
        } else {
            ou_path::department_to_dn(ctx, department)
        };
    }

    let company_root = if company.dn_prefix.trim().is_empty() {
        format!("{},{}", Rdn::new("OU", applicant.company.trim()), ctx.partner_root_dn())
    } else {
        format!("{},{}", company.dn_prefix.trim(), ctx.partner_root_dn())
    };

    // A department already spelled from the company down maps through the usual path.
    match ou_path::department_tokens(department).first() {
        Some(top) if top.eq_ignore_ascii_case(applicant.company.trim()) => {
            ou_path::department_to_dn(ctx, department)
        }
        _ => ou_path::department_under(&company_root, department),
    }
}

/// Split requested platforms into "directory account wanted" and downstream specs.
///
/// Requesting a platform that authenticates against the directory implies the
/// directory account. An empty request means the directory account only.
pub fn plan_platforms(
    ctx: &SyncContext,
    requested: &[String],
) -> SyncResult<(bool, Vec<PlatformSpec>)> {
    if requested.iter().all(|p| p.trim().is_empty()) {
        return Ok((true, Vec::new()));
    }

    let mut wants_directory = false;
    let mut downstream: Vec<PlatformSpec> = Vec::new();

    for name in requested.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
        if ctx.is_directory_platform(name) {
            wants_directory = true;
            continue;
        }
        let spec = ctx
            .platform(name)
            .ok_or_else(|| SyncError::validation("platforms", format!("unknown platform '{name}'")))?;
        wants_directory |= spec.requires_directory;
        if !downstream.iter().any(|p| p.name.eq_ignore_ascii_case(&spec.name)) {
            downstream.push(spec.clone());
        }
    }
    Ok((wants_directory, downstream))
}

#[instrument(skip(services, order, now), fields(order_id = %order.order_id))]
pub async fn handle(
    services: &OrderServices,
    order: &OrderDetail,
    now: DateTime<Utc>,
) -> SyncResult<()> {
    let applicants = applicants(&order.form);
    let mut first_error = None;

    for applicant in &applicants {
        if let Err(e) = register_applicant(services, applicant, now).await {
            warn!(
                applicant = %applicant.name,
                employee_id = %applicant.employee_id,
                error = %e,
                "Applicant registration failed"
            );
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

async fn register_applicant(
    services: &OrderServices,
    applicant: &Applicant,
    now: DateTime<Utc>,
) -> SyncResult<()> {
    let ctx = services.ctx.as_ref();

    if applicant.name.is_empty() {
        return Err(SyncError::validation("name", "applicant has no name"));
    }
    let email_local = validate_email(&applicant.email)?;
    if !applicant.phone.is_empty() {
        validate_phone(&applicant.phone)?;
    }

    let (wants_directory, downstream) = plan_platforms(ctx, &applicant.platforms)?;

    if wants_directory {
        create_directory_account(services, applicant, email_local, now).await?;
    }

    for platform in &downstream {
        services.platforms.provision(platform, applicant).await?;
        info!(platform = %platform.name, applicant = %applicant.name, "Provisioned platform account");
    }
    Ok(())
}

async fn create_directory_account(
    services: &OrderServices,
    applicant: &Applicant,
    email_local: &str,
    now: DateTime<Utc>,
) -> SyncResult<()> {
    let ctx = services.ctx.as_ref();
    let settings = ctx.settings();
    let directory = services.directory.as_ref();

    let company = ctx.companies().resolve(&applicant.company);
    let prefix = if company.is_external {
        settings.external_login_prefix.as_str()
    } else {
        ""
    };
    let login = login_for(prefix, email_local)?;

    if account::login_exists(directory, ctx, &login).await? {
        info!(login = %login, "Directory account already exists, not created again");
        return Ok(());
    }

    let container = container_for(ctx, &company, applicant);
    ou_path::ensure_ou_path(directory, ctx, &container).await?;

    let entry_dn = format!("{},{}", Rdn::new("CN", applicant.name.as_str()), container);
    let expires = if company.is_external {
        datetime_to_filetime(now + Duration::days(settings.external_account_days))
    } else {
        NEVER_EXPIRES
    };
    let password = generate_password(settings.password_length);

    let mut attrs = AttributeSet::new()
        .with(attr::OBJECT_CLASS, vec!["top", "person", "organizationalPerson", "user"])
        .with(attr::CN, applicant.name.as_str())
        .with(attr::LOGIN, login.as_str())
        .with(attr::DISPLAY_NAME, applicant.name.as_str())
        .with(attr::MAIL, applicant.email.trim())
        .with(attr::UNICODE_PWD, encode_ad_password(&password)?)
        .with(attr::ACCOUNT_CONTROL, UserAccountControl::ENABLED)
        .with(attr::PWD_LAST_SET, 0i64)
        .with(attr::ACCOUNT_EXPIRES, expires);
    if !settings.upn_suffix.is_empty() {
        attrs.set(attr::UPN, format!("{login}@{}", settings.upn_suffix));
    }
    for (name, value) in [
        (attr::EMPLOYEE_ID, applicant.employee_id.as_str()),
        (attr::PHONE, applicant.phone.as_str()),
        (attr::COMPANY, applicant.company.as_str()),
        (attr::DEPARTMENT, applicant.department.as_str()),
        (attr::TITLE, applicant.title.as_str()),
    ] {
        if !value.trim().is_empty() {
            attrs.set(name, value.trim());
        }
    }

    directory.add(&entry_dn, attrs).await?;
    info!(dn = %entry_dn, login = %login, external = company.is_external, "Created directory account");

    let html = format!(
        "<p>{name}, your account has been created.</p>\
         <p>Login: <b>{login}</b><br/>Initial password: <b>{password}</b></p>\
         <p>You must change the password at first logon.</p>",
        name = escape_html(&applicant.name),
        login = escape_html(&login),
        password = escape_html(&password),
    );
    if let Err(e) = services
        .notifier
        .send_email(&[applicant.email.trim().to_string()], "Directory account created", &html)
        .await
    {
        warn!(login = %login, error = %e, "Failed to email new account credentials");
    }
    Ok(())
}

/// Escape text placed into an HTML email body.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
