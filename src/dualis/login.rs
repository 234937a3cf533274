//! Login against the portal's external welcome page.
//!
//! The login form carries six hidden parameters that must be echoed back.
//! The response sets the session id in a `Set-Cookie` header the cookie jar
//! cannot use on its own (no usable scope), so the value is copied into a
//! `cnsc` cookie by hand. The next page is named by the `Refresh` header.

use crate::dualis::errors::{CrawlError, Stage};
use crate::dualis::session::{PortalResponse, Session};
use crate::fmt::redacted;
use custom_debug_derive::Debug;
use html_scraper::{Html, Selector};
use tracing::{debug, info, warn};

/// Entry page selecting the "external welcome" screen.
pub const ENTRY_PATH: &str = "/scripts/mgrqispi.dll?APPNAME=CampusNet&PRGNAME=EXTERNALPAGES&ARGUMENTS=-N000000000000001,-N000324,-Awelcome";

/// Login form target.
pub const LOGIN_PATH: &str = "/scripts/mgrqispi.dll";

/// Name of the auth cookie the portal expects on every later request.
pub const AUTH_COOKIE_NAME: &str = "cnsc";

/// Portal account credentials, supplied by the caller.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    #[debug(with = redacted)]
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Hidden inputs scraped from the login page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HiddenFormFields {
    pub appname: String,
    pub prgname: String,
    pub arguments: String,
    pub clino: String,
    pub menuno: String,
    pub menu_type: String,
}

impl HiddenFormFields {
    /// Read the six hidden inputs by `name`. Missing inputs become empty strings.
    pub fn extract(body: &str) -> Self {
        let html = Html::parse_document(body);
        let value_of = |name: &str| -> String {
            let selector = match Selector::parse(&format!(r#"input[name="{name}"]"#)) {
                Ok(s) => s,
                Err(_) => return String::new(),
            };
            html.select(&selector)
                .next()
                .and_then(|input| input.attr("value"))
                .unwrap_or_default()
                .to_owned()
        };

        Self {
            appname: value_of("APPNAME"),
            prgname: value_of("PRGNAME"),
            arguments: value_of("ARGUMENTS"),
            clino: value_of("clino"),
            menuno: value_of("menuno"),
            menu_type: value_of("menu_type"),
        }
    }

    /// Names of fields that came back empty.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("APPNAME", &self.appname),
            ("PRGNAME", &self.prgname),
            ("ARGUMENTS", &self.arguments),
            ("clino", &self.clino),
            ("menuno", &self.menuno),
            ("menu_type", &self.menu_type),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Form body for the login POST.
    pub fn login_form<'a>(&'a self, credentials: &'a Credentials) -> Vec<(&'static str, &'a str)> {
        vec![
            ("APPNAME", self.appname.as_str()),
            ("PRGNAME", self.prgname.as_str()),
            ("ARGUMENTS", self.arguments.as_str()),
            ("clino", self.clino.as_str()),
            ("menuno", self.menuno.as_str()),
            ("menu_type", self.menu_type.as_str()),
            ("browser", ""),
            ("plattform", ""),
            ("usrname", credentials.username.as_str()),
            ("pass", credentials.password.as_str()),
        ]
    }
}

/// Value between the first `=` and the first `;` of a raw `Set-Cookie` header.
///
/// A header without `;` yields everything after the `=`.
pub fn parse_auth_cookie(set_cookie: &str) -> Option<&str> {
    let start = set_cookie.find('=')? + 1;
    let rest = &set_cookie[start..];
    let value = match rest.find(';') {
        Some(end) => &rest[..end],
        None => rest,
    };
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// Substring after the first `=` of a `Refresh` header, e.g. `0;URL=/next` -> `/next`.
pub fn parse_refresh_target(refresh: &str) -> Option<&str> {
    let start = refresh.find('=')? + 1;
    let target = refresh[start..].trim();
    (!target.is_empty()).then_some(target)
}

/// Pull the auth cookie and refresh target out of the login response.
fn handle_login_response(
    session: &Session,
    response: &PortalResponse,
) -> Result<String, CrawlError> {
    let set_cookie = response
        .header("set-cookie")
        .ok_or_else(|| CrawlError::Authentication {
            url: response.url.clone(),
            reason: "no Set-Cookie header in login response".into(),
        })?;
    let value = parse_auth_cookie(&set_cookie).ok_or_else(|| CrawlError::Authentication {
        url: response.url.clone(),
        reason: "Set-Cookie header carries no session value".into(),
    })?;

    let auth_cookie = cookie::Cookie::build((AUTH_COOKIE_NAME, value.to_owned()))
        .path("/")
        .build();
    session.inject_cookie(&auth_cookie);

    let refresh = response
        .header("refresh")
        .ok_or_else(|| CrawlError::navigation(Stage::Login, &response.url, "no Refresh header"))?;
    let target = parse_refresh_target(&refresh).ok_or_else(|| {
        CrawlError::navigation(
            Stage::Login,
            &response.url,
            format!("Refresh header has no target: {refresh:?}"),
        )
    })?;

    Ok(target.to_owned())
}

/// Log in and return the post-login navigation target.
///
/// On success the session jar holds the `cnsc` auth cookie.
pub async fn login(session: &Session, credentials: &Credentials) -> Result<String, CrawlError> {
    let entry = session.get(Stage::Login, ENTRY_PATH).await?;
    let fields = HiddenFormFields::extract(&entry.body);

    let missing = fields.missing();
    if !missing.is_empty() {
        warn!(?missing, "login page is missing hidden form values");
    }
    debug!(?fields, "extracted hidden login fields");

    let form = fields.login_form(credentials);
    let response = session.post_form(Stage::Login, LOGIN_PATH, &form).await?;
    let target = handle_login_response(session, &response)?;

    info!(username = credentials.username.as_str(), "logged in to portal");
    Ok(target)
}
