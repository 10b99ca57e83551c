//! Best-effort login for pages that redirect to a sign-in form.

use crate::async_api::Page;
use crate::{Error, Result};
use log::{debug, info};
use regex::Regex;
use std::time::Duration;

/// Default URL pattern identifying a login page.
///
/// A path segment must start with `login`, `log-in`, `signin`, `sign-in`,
/// `sign_in` or `auth` and end there (or continue with an extension). Host
/// names, query strings and words such as `authors` or `oauth` do not count.
pub const DEFAULT_LOGIN_PATTERN: &str =
    r"(?i)^[a-z][a-z0-9+.-]*://[^/?#]*/(?:[^?#]*/)?(log-?in|sign[-_]?in|auth)(?:[/.?#]|$)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Credentials are only usable when both parts are given.
    pub fn from_parts(username: Option<String>, password: Option<String>) -> Option<Self> {
        match (username, password) {
            (Some(username), Some(password)) => Some(Self { username, password }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginConfig {
    /// Matched against the page URL after navigation.
    pub pattern: Regex,
    pub username_selectors: Vec<String>,
    pub password_selectors: Vec<String>,
    pub submit_selectors: Vec<String>,
    /// How long to wait for the login to land back on the target URL.
    pub navigation_timeout: Duration,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            pattern: Regex::new(DEFAULT_LOGIN_PATTERN).expect("default login pattern is valid"),
            username_selectors: strings(&[
                r#"input[name="username"]"#,
                r#"input[name="email"]"#,
                r#"input[name="login"]"#,
                r#"input[type="email"]"#,
            ]),
            password_selectors: strings(&[r#"input[name="password"]"#, r#"input[type="password"]"#]),
            submit_selectors: strings(&[r#"button[type="submit"]"#, r#"input[type="submit"]"#]),
            navigation_timeout: Duration::from_millis(30000),
        }
    }
}

impl LoginConfig {
    /// Replace the URL pattern.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        self.pattern = Regex::new(pattern)
            .map_err(|e| Error::ConfigError(format!("invalid login pattern {:?}: {}", pattern, e)))?;
        Ok(self)
    }

    pub fn is_login_url(&self, url: &str) -> bool {
        self.pattern.is_match(url)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Log in if the page currently shows a login URL.
///
/// Returns `true` when a login was performed. `target` is the URL the page
/// must return to once the form has been submitted.
pub async fn authenticate(
    page: &Page,
    target: &str,
    credentials: Option<&Credentials>,
    config: &LoginConfig,
) -> Result<bool> {
    let current = page.current_url().await?;
    if !config.is_login_url(&current) {
        debug!("{} is not a login page", current);
        return Ok(false);
    }

    let creds = credentials.ok_or_else(|| Error::AuthenticationRequired(current.clone()))?;
    info!("login page detected at {}; submitting credentials", current);

    let user_field = first_present(page, &config.username_selectors).await?;
    let pass_field = first_present(page, &config.password_selectors).await?;
    let submit = first_present(page, &config.submit_selectors).await?;

    page.fill(&user_field, &creds.username).await?;
    page.fill(&pass_field, &creds.password).await?;
    page.click(&submit).await?;

    match page.wait_for_url(target, config.navigation_timeout).await {
        Ok(()) => {
            info!("logged in; back at {}", target);
            Ok(true)
        }
        Err(Error::Timeout(ms)) => Err(Error::AuthenticationFailed(format!(
            "did not return to {} within {}ms after submitting the login form",
            target, ms
        ))),
        Err(e) => Err(e),
    }
}

async fn first_present(page: &Page, candidates: &[String]) -> Result<String> {
    for selector in candidates {
        if page.has_element(selector).await? {
            return Ok(selector.clone());
        }
    }
    Err(Error::ElementNotFound(candidates.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::async_api::Browser;
    use crate::testing::{MockPage, Script};

    const TARGET: &str = "https://example.com/dashboard";
    const LOGIN: &str = "https://example.com/login?next=%2Fdashboard";

    fn creds() -> Credentials {
        Credentials {
            username: "ada".into(),
            password: "hunter2".into(),
        }
    }

    async fn open(script: Script) -> (Browser, Page) {
        let browser = Browser::with_driver(move || Ok(MockPage::new(script))).await.unwrap();
        let page = browser.page();
        page.goto(TARGET).await.unwrap();
        (browser, page)
    }

    #[test]
    fn default_pattern_matches_common_login_urls() {
        let cfg = LoginConfig::default();
        for url in [
            "https://a.com/login",
            "https://a.com/users/sign_in",
            "https://a.com/SignIn",
            "https://a.com/log-in",
            "https://a.com/auth/realms/main",
            "https://a.com/login.php?next=%2F",
            "file:///tmp/site/login.html",
        ] {
            assert!(cfg.is_login_url(url), "{url}");
        }
        for url in [
            "https://a.com/blog/post",
            "https://blog.example.com/authors/jane",
            "https://a.com/docs/oauth",
            "https://auth.example.com/",
            "https://a.com/post?ref=login",
            "https://a.com/signing-up",
        ] {
            assert!(!cfg.is_login_url(url), "{url}");
        }
    }

    #[tokio::test]
    async fn author_page_is_not_mistaken_for_login() {
        let author = "https://blog.example.com/authors/jane";
        let browser = Browser::with_driver(move || Ok(MockPage::new(Script::with_heights(&[600.0]))))
            .await
            .unwrap();
        let page = browser.page();
        page.goto(author).await.unwrap();

        let did_login = authenticate(&page, author, None, &LoginConfig::default())
            .await
            .unwrap();
        assert!(!did_login);
        browser.close().await.unwrap();
    }

    #[test]
    fn partial_credentials_are_ignored() {
        assert!(Credentials::from_parts(Some("u".into()), None).is_none());
        assert!(Credentials::from_parts(None, Some("p".into())).is_none());
        assert_eq!(
            Credentials::from_parts(Some("u".into()), Some("p".into())),
            Some(Credentials {
                username: "u".into(),
                password: "p".into()
            })
        );
    }

    #[test]
    fn invalid_custom_pattern_is_config_error() {
        let err = LoginConfig::default().with_pattern("(unclosed").unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[tokio::test]
    async fn login_page_without_credentials_fails() {
        let (browser, page) = open(Script::with_heights(&[600.0]).login_form(LOGIN)).await;
        let err = authenticate(&page, TARGET, None, &LoginConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AuthenticationRequired(ref url) if url == LOGIN));
        browser.close().await.unwrap();
    }

    #[tokio::test]
    async fn credentials_are_filled_and_submitted() {
        let script = Script::with_heights(&[600.0]).login_form(LOGIN);
        let log = script.log.clone();
        let (browser, page) = open(script).await;

        let creds = creds();
        let did_login = authenticate(&page, TARGET, Some(&creds), &LoginConfig::default())
            .await
            .unwrap();
        assert!(did_login);
        assert_eq!(page.current_url().await.unwrap(), TARGET);

        let log = log.lock().unwrap();
        assert_eq!(
            log.fills,
            vec![
                (r#"input[name="username"]"#.to_string(), "ada".to_string()),
                (r#"input[name="password"]"#.to_string(), "hunter2".to_string()),
            ]
        );
        assert_eq!(log.clicks, vec![r#"button[type="submit"]"#.to_string()]);
        drop(log);
        browser.close().await.unwrap();
    }

    #[tokio::test]
    async fn non_login_page_is_left_alone() {
        let script = Script::with_heights(&[600.0]);
        let log = script.log.clone();
        let (browser, page) = open(script).await;

        let did_login = authenticate(&page, TARGET, Some(&creds()), &LoginConfig::default())
            .await
            .unwrap();
        assert!(!did_login);
        assert!(log.lock().unwrap().fills.is_empty());
        browser.close().await.unwrap();
    }

    #[tokio::test]
    async fn login_that_never_returns_fails() {
        let mut script = Script::with_heights(&[600.0]).login_form(LOGIN);
        script.login_returns = false;
        let (browser, page) = open(script).await;

        let cfg = LoginConfig {
            navigation_timeout: Duration::from_millis(200),
            ..LoginConfig::default()
        };
        let err = authenticate(&page, TARGET, Some(&creds()), &cfg).await.unwrap_err();
        assert!(matches!(err, Error::AuthenticationFailed(_)));
        browser.close().await.unwrap();
    }

    #[tokio::test]
    async fn missing_form_fields_are_reported() {
        let mut script = Script::with_heights(&[600.0]).login_form(LOGIN);
        script.elements.clear();
        let (browser, page) = open(script).await;

        let err = authenticate(&page, TARGET, Some(&creds()), &LoginConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ElementNotFound(_)));
        browser.close().await.unwrap();
    }
}
