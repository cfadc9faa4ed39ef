use std::fmt;
use std::str::FromStr;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Body, Client, Identity, Method, Response};
use tracing::{debug, warn};

use crate::errors::{Result, WebDavError};
use crate::urn::{unquote, Urn};

use super::config::ConnectionSettings;

/// Logical operations the client performs, each mapped to one HTTP request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Download,
    Upload,
    Copy,
    Move,
    Mkdir,
    Clean,
    Check,
    List,
    Free,
    Info,
    GetProperty,
    SetProperty,
}

impl Action {
    pub const ALL: [Action; 12] = [
        Action::Download,
        Action::Upload,
        Action::Copy,
        Action::Move,
        Action::Mkdir,
        Action::Clean,
        Action::Check,
        Action::List,
        Action::Free,
        Action::Info,
        Action::GetProperty,
        Action::SetProperty,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Action::Download => "download",
            Action::Upload => "upload",
            Action::Copy => "copy",
            Action::Move => "move",
            Action::Mkdir => "mkdir",
            Action::Clean => "clean",
            Action::Check => "check",
            Action::List => "list",
            Action::Free => "free",
            Action::Info => "info",
            Action::GetProperty => "get_property",
            Action::SetProperty => "set_property",
        }
    }

    /// HTTP verb used when no override is configured
    pub fn default_method(&self) -> &'static str {
        match self {
            Action::Download => "GET",
            Action::Upload => "PUT",
            Action::Copy => "COPY",
            Action::Move => "MOVE",
            Action::Mkdir => "MKCOL",
            Action::Clean => "DELETE",
            Action::Check => "HEAD",
            Action::List | Action::Free | Action::Info | Action::GetProperty => "PROPFIND",
            Action::SetProperty => "PROPPATCH",
        }
    }

    pub fn default_headers(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Action::List | Action::Info => &[("Accept", "*/*"), ("Depth", "1")],
            Action::Free => &[("Accept", "*/*"), ("Depth", "0"), ("Content-Type", "text/xml")],
            Action::GetProperty | Action::SetProperty => &[
                ("Accept", "*/*"),
                ("Depth", "1"),
                ("Content-Type", "application/x-www-form-urlencoded"),
            ],
            _ => &[("Accept", "*/*")],
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = WebDavError;

    fn from_str(s: &str) -> Result<Self> {
        Action::ALL
            .into_iter()
            .find(|action| action.name() == s)
            .ok_or_else(|| WebDavError::option_not_valid("override_methods", s))
    }
}

/// Value of the `Depth` header for COPY of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Depth {
    Zero,
    One,
    #[default]
    Infinity,
}

impl Depth {
    pub fn as_header_value(&self) -> &'static str {
        match self {
            Depth::Zero => "0",
            Depth::One => "1",
            Depth::Infinity => "infinity",
        }
    }
}

/// Executes single WebDAV requests and classifies their outcome.
///
/// No retries are performed; every failure surfaces immediately as a
/// [`WebDavError`].
#[derive(Debug, Clone)]
pub struct WebDavConnection {
    client: Client,
    settings: ConnectionSettings,
}

impl WebDavConnection {
    /// Validates and normalizes `settings`, then builds the HTTP client
    pub fn new(settings: ConnectionSettings) -> Result<Self> {
        settings.validate()?;
        let settings = settings.normalized();

        let mut builder = Client::builder().timeout(settings.timeout());

        if let (Some(cert_path), Some(key_path)) = (&settings.cert_path, &settings.key_path) {
            let mut pem =
                std::fs::read(cert_path).map_err(|e| WebDavError::local_io(cert_path, e))?;
            pem.push(b'\n');
            pem.extend(std::fs::read(key_path).map_err(|e| WebDavError::local_io(key_path, e))?);

            let identity = Identity::from_pem(&pem).map_err(|_| {
                WebDavError::option_not_valid("cert_path", cert_path.display().to_string())
            })?;
            builder = builder.identity(identity);
        }

        let client = builder
            .build()
            .map_err(|source| WebDavError::ConnectionException { source })?;

        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub fn hostname(&self) -> &str {
        &self.settings.hostname
    }

    /// Verb for `action`, the per-instance override taking precedence
    pub fn method_for(&self, action: Action) -> Result<Method> {
        let verb = self
            .settings
            .override_methods
            .get(&action)
            .map(String::as_str)
            .unwrap_or_else(|| action.default_method());

        Method::from_bytes(verb.as_bytes())
            .map_err(|_| WebDavError::option_not_valid("override_methods", verb))
    }

    /// Absolute request URL of `urn`
    pub fn url_for(&self, urn: &Urn) -> String {
        format!("{}{}{}", self.settings.hostname, self.settings.root, urn.quote())
    }

    /// Decoded server-side path of `urn`, root prefix included
    pub fn full_path(&self, urn: &Urn) -> String {
        format!("{}{}", unquote(&self.settings.root), urn.path())
    }

    fn build_headers(&self, action: Action, extra_headers: &[(&str, String)]) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        let defaults = action
            .default_headers()
            .iter()
            .map(|(name, value)| (*name, value.to_string()));
        let extras = extra_headers
            .iter()
            .map(|(name, value)| (*name, value.clone()));

        for (name, value) in defaults.chain(extras) {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| WebDavError::option_not_valid(name, value.clone()))?;
            let header_value = HeaderValue::from_str(&value)
                .map_err(|_| WebDavError::option_not_valid(name, value.clone()))?;
            headers.insert(header_name, header_value);
        }

        if let Some(token) = self.settings.token.as_deref().filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| WebDavError::option_not_valid("token", "<hidden>"))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    /// Performs `action` on `urn` and classifies the response status
    pub async fn execute(
        &self,
        action: Action,
        urn: &Urn,
        body: Option<Body>,
        extra_headers: &[(&str, String)],
    ) -> Result<Response> {
        let method = self.method_for(action)?;
        let url = self.url_for(urn);
        let headers = self.build_headers(action, extra_headers)?;

        debug!("🌐 {} {} ({})", method, url, action);

        let mut request = self.client.request(method, &url).headers(headers);

        if !self.settings.uses_token() {
            if let Some(login) = self.settings.login.as_deref().filter(|l| !l.is_empty()) {
                request = request.basic_auth(login, self.settings.password.as_deref());
            }
        }

        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        self.classify(action, urn, &url, response).await
    }

    fn transport_error(&self, error: reqwest::Error) -> WebDavError {
        if error.is_connect() {
            warn!("❌ No connection with {}: {}", self.settings.hostname, error);
            WebDavError::NoConnection {
                hostname: self.settings.hostname.clone(),
            }
        } else {
            warn!("❌ Request to {} failed: {}", self.settings.hostname, error);
            WebDavError::ConnectionException { source: error }
        }
    }

    async fn classify(
        &self,
        action: Action,
        urn: &Urn,
        url: &str,
        response: Response,
    ) -> Result<Response> {
        let status = response.status();

        match status.as_u16() {
            507 => {
                warn!("Server reports insufficient storage for {} {}", action, url);
                Err(WebDavError::NotEnoughSpace)
            }
            404 => {
                debug!("{} {}: not found", action, url);
                Err(WebDavError::remote_not_found(self.full_path(urn)))
            }
            405 => {
                debug!("{} {}: method not allowed", action, url);
                Err(WebDavError::method_not_supported(
                    action.name(),
                    self.settings.hostname.clone(),
                ))
            }
            code if code >= 400 => {
                let message = response.text().await.unwrap_or_default();
                warn!("{} {} failed with status {}", action, url, code);
                Err(WebDavError::ResponseErrorCode {
                    url: url.to_string(),
                    code,
                    message,
                })
            }
            _ => Ok(response),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(settings: ConnectionSettings) -> WebDavConnection {
        WebDavConnection::new(settings).unwrap()
    }

    #[test]
    fn test_default_methods() {
        assert_eq!(Action::Download.default_method(), "GET");
        assert_eq!(Action::Upload.default_method(), "PUT");
        assert_eq!(Action::Mkdir.default_method(), "MKCOL");
        assert_eq!(Action::Clean.default_method(), "DELETE");
        assert_eq!(Action::Check.default_method(), "HEAD");
        assert_eq!(Action::Free.default_method(), "PROPFIND");
        assert_eq!(Action::SetProperty.default_method(), "PROPPATCH");
    }

    #[test]
    fn test_default_headers() {
        assert_eq!(Action::List.default_headers(), &[("Accept", "*/*"), ("Depth", "1")]);
        assert_eq!(
            Action::Free.default_headers(),
            &[("Accept", "*/*"), ("Depth", "0"), ("Content-Type", "text/xml")]
        );
        assert_eq!(Action::Move.default_headers(), &[("Accept", "*/*")]);
    }

    #[test]
    fn test_action_names_round_trip() {
        for action in Action::ALL {
            assert_eq!(Action::from_str(action.name()).unwrap(), action);
        }
        assert!(Action::from_str("lock").is_err());
    }

    #[test]
    fn test_override_takes_precedence() {
        let conn = connection(
            ConnectionSettings::new("http://localhost:8585", "user", "pass")
                .with_override_method(Action::Check, "GET"),
        );
        assert_eq!(conn.method_for(Action::Check).unwrap(), Method::GET);
        assert_eq!(conn.method_for(Action::Download).unwrap(), Method::GET);
        assert_eq!(conn.method_for(Action::List).unwrap().as_str(), "PROPFIND");
    }

    #[test]
    fn test_url_composition() {
        let conn = connection(
            ConnectionSettings::new("http://localhost:8585/", "user", "pass")
                .with_root("/remote.php/webdav/"),
        );
        let urn = Urn::new("test dir/file.txt");
        assert_eq!(
            conn.url_for(&urn),
            "http://localhost:8585/remote.php/webdav/test%20dir/file.txt"
        );
        assert_eq!(conn.full_path(&urn), "/remote.php/webdav/test dir/file.txt");
    }

    #[test]
    fn test_extra_headers_replace_defaults() {
        let conn = connection(ConnectionSettings::new("http://localhost:8585", "user", "pass"));
        let headers = conn
            .build_headers(Action::List, &[("Depth", "0".to_string())])
            .unwrap();
        assert_eq!(headers.get("depth").unwrap(), "0");
        assert_eq!(headers.get("accept").unwrap(), "*/*");
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_token_is_sent_as_bearer() {
        let conn = connection(ConnectionSettings::with_token("http://localhost:8585", "abc"));
        let headers = conn.build_headers(Action::Check, &[]).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
    }

    #[test]
    fn test_depth_header_values() {
        assert_eq!(Depth::Zero.as_header_value(), "0");
        assert_eq!(Depth::One.as_header_value(), "1");
        assert_eq!(Depth::default().as_header_value(), "infinity");
    }
}
