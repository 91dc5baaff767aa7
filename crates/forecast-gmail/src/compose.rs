//! Build the forecast email: HTML body from a Tera template plus the condition
//! icon as an inline related part.
//!
//! Output is a pure function of the forecast, the config and the two files on
//! disk. There is no `Date` or `Message-ID` header and the boundary is fixed, so
//! composing twice gives identical bytes.

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use forecast_core::MailConfig;
use forecast_weather::Forecast;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};

use crate::types::SendEnvelope;

pub const SUBJECT: &str = "Today's Forecast";

/// Referenced from the template as `cid:forecast-icon`
pub const ICON_CONTENT_ID: &str = "forecast-icon";

const BOUNDARY: &str = "forecast-mailer-related";
const LINE_WIDTH: usize = 76;

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("Failed to read email template {}", path.display())]
    Template { path: PathBuf, source: io::Error },

    #[error("Failed to read forecast icon {}", path.display())]
    Icon { path: PathBuf, source: io::Error },

    #[error("Failed to render email template: {0}")]
    Render(#[from] tera::Error),
}

/// A fully built message, ready to hand to Gmail.
#[derive(Debug, Clone)]
pub struct ComposedMessage {
    html_body: String,
    icon_path: PathBuf,
    mime: Vec<u8>,
    envelope: SendEnvelope,
}

impl ComposedMessage {
    pub fn html_body(&self) -> &str {
        &self.html_body
    }

    pub fn icon_path(&self) -> &Path {
        &self.icon_path
    }

    /// The RFC 822 message before transport encoding
    pub fn mime(&self) -> &[u8] {
        &self.mime
    }

    pub fn envelope(&self) -> &SendEnvelope {
        &self.envelope
    }
}

pub struct EmailComposer {
    sender: String,
    recipient: String,
    template_path: PathBuf,
    icon_dir: PathBuf,
}

impl EmailComposer {
    pub fn new(config: &MailConfig) -> Self {
        Self {
            sender: config.sender.clone(),
            recipient: config.recipient.clone(),
            template_path: config.template_path.clone(),
            icon_dir: config.icon_dir.clone(),
        }
    }

    /// Where the icon for `icon_filename` lives in the local library.
    pub fn icon_path(&self, icon_filename: &str) -> PathBuf {
        self.icon_dir.join("64x64").join("day").join(icon_filename)
    }

    /// Render the body, attach the icon and encode the result for sending.
    #[tracing::instrument(skip(self, forecast), level = "debug")]
    pub fn compose(&self, forecast: &Forecast) -> Result<ComposedMessage, ComposeError> {
        let html_body = self.render_body(forecast)?;

        let icon_path = self.icon_path(forecast.icon_filename());
        let icon = fs::read(&icon_path).map_err(|source| ComposeError::Icon {
            path: icon_path.clone(),
            source,
        })?;

        let mime = self.build_mime(&html_body, &icon, forecast.icon_filename());
        let envelope = SendEnvelope {
            raw: URL_SAFE.encode(&mime),
        };

        tracing::debug!("Composed {} byte message with icon {:?}", mime.len(), icon_path);
        Ok(ComposedMessage {
            html_body,
            icon_path,
            mime,
            envelope,
        })
    }

    fn render_body(&self, forecast: &Forecast) -> Result<String, ComposeError> {
        let template =
            fs::read_to_string(&self.template_path).map_err(|source| ComposeError::Template {
                path: self.template_path.clone(),
                source,
            })?;

        let mut context = Context::new();
        context.insert("max_temp", &forecast.max_temp());
        context.insert("min_temp", &forecast.min_temp());
        context.insert("total_precip", &forecast.total_precip());
        context.insert("condition", forecast.condition());

        Ok(Tera::one_off(&template, &context, true)?)
    }

    fn build_mime(&self, html_body: &str, icon: &[u8], icon_filename: &str) -> Vec<u8> {
        let icon_name = Path::new(icon_filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(icon_filename);

        let mut msg = String::new();
        msg.push_str(&format!("From: {}\r\n", self.sender));
        msg.push_str(&format!("To: {}\r\n", self.recipient));
        msg.push_str(&format!("Subject: {}\r\n", SUBJECT));
        msg.push_str("MIME-Version: 1.0\r\n");
        msg.push_str(&format!("Content-Type: multipart/related; boundary=\"{}\"\r\n", BOUNDARY));
        msg.push_str("\r\n");

        msg.push_str(&format!("--{}\r\n", BOUNDARY));
        msg.push_str("Content-Type: text/html; charset=\"utf-8\"\r\n");
        msg.push_str("Content-Transfer-Encoding: base64\r\n");
        msg.push_str("\r\n");
        msg.push_str(&wrapped_base64(html_body.as_bytes()));

        msg.push_str(&format!("--{}\r\n", BOUNDARY));
        msg.push_str("Content-Type: image/png\r\n");
        msg.push_str("Content-Transfer-Encoding: base64\r\n");
        msg.push_str(&format!("Content-ID: <{}>\r\n", ICON_CONTENT_ID));
        msg.push_str(&format!("Content-Disposition: inline; filename=\"{}\"\r\n", icon_name));
        msg.push_str("\r\n");
        msg.push_str(&wrapped_base64(icon));

        msg.push_str(&format!("--{}--\r\n", BOUNDARY));
        msg.into_bytes()
    }
}

/// Base64 body text, CRLF after every line (RFC 2045 limits lines to 76 chars).
fn wrapped_base64(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / LINE_WIDTH * 2 + 2);
    // base64 output is ASCII, so byte chunks are valid str slices
    for line in encoded.as_bytes().chunks(LINE_WIDTH) {
        out.push_str(&String::from_utf8_lossy(line));
        out.push_str("\r\n");
    }
    out
}
