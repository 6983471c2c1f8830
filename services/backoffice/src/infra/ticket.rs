use std::io::Write as _;
use std::path::PathBuf;

use qrcode::QrCode;
use qrcode::render::svg;

use crate::domain::html::escape_html;
use crate::domain::repository::AttachmentRenderer;
use crate::domain::types::{IssuedCredential, TicketArtifact};
use crate::error::RenderError;

pub const TICKET_CONTENT_TYPE: &str = "text/html";

/// Renders QR codes as SVG and printable tickets as standalone HTML files.
#[derive(Debug, Clone, Default)]
pub struct HtmlTicketRenderer {
    /// Directory for transient ticket files; the system temp dir when `None`.
    pub dir: Option<PathBuf>,
}

impl HtmlTicketRenderer {
    fn ticket_html(
        &self,
        participant_name: &str,
        credentials: &[IssuedCredential],
    ) -> Result<String, RenderError> {
        let name = escape_html(participant_name);
        let mut sections = String::new();
        for credential in credentials {
            let image = self.render_signed_image(&credential.payload)?;
            sections.push_str(&format!(
                "<section class=\"day\"><h2>{day}</h2>{image}</section>\n",
                day = credential.day,
            ));
        }
        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Ticket - {name}</title>
</head>
<body style="font-family: Arial, sans-serif; text-align: center;">
    <h1>{name}</h1>
{sections}</body>
</html>
"#
        ))
    }
}

impl AttachmentRenderer for HtmlTicketRenderer {
    fn render_signed_image(&self, payload: &str) -> Result<String, RenderError> {
        let code = QrCode::new(payload.as_bytes()).map_err(|e| RenderError::Qr(e.to_string()))?;
        let image = code
            .render::<svg::Color<'_>>()
            .min_dimensions(240, 240)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build();
        // Drop the XML declaration so the SVG can be inlined into HTML.
        Ok(match image.find("<svg") {
            Some(start) => image[start..].to_owned(),
            None => image,
        })
    }

    fn render_credential_artifact(
        &self,
        participant_name: &str,
        credentials: &[IssuedCredential],
    ) -> Result<TicketArtifact, RenderError> {
        let html = self.ticket_html(participant_name, credentials)?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("ticket-").suffix(".html");
        let mut file = match &self.dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(html.as_bytes())?;
        file.flush()?;

        Ok(TicketArtifact {
            filename: "ticket.html".to_owned(),
            content_type: TICKET_CONTENT_TYPE.to_owned(),
            file,
        })
    }
}
