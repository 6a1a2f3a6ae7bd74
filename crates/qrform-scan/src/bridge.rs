//! Connects a scanner to the form.

use tracing::{debug, info, warn};

use crate::form::{FormField, FormIds, FormSink};
use crate::payload::ScanPayload;
use crate::scanner::{QrScanner, ScanResultMeta, ScannerConfig};
use crate::{ScanError, ScanResult};

/// Outcome of a scanning session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSession {
    /// Scans that filled the form.
    pub accepted: usize,
    /// Scans that were rejected and left the form as it was.
    pub rejected: usize,
    /// Why the most recent rejected scan was rejected.
    pub last_error: Option<ScanError>,
}

/// Fills a form from decoded QR text.
#[derive(Debug)]
pub struct ScanBridge<S: FormSink> {
    form: S,
    ids: FormIds,
}

impl<S: FormSink> ScanBridge<S> {
    /// Bridge writing to the stock input ids.
    pub fn new(form: S) -> Self {
        Self::with_ids(form, FormIds::default())
    }

    pub fn with_ids(form: S, ids: FormIds) -> Self {
        Self { form, ids }
    }

    pub fn form(&self) -> &S {
        &self.form
    }

    pub fn into_form(self) -> S {
        self.form
    }

    /// Handle one successful decode.
    ///
    /// Writes batch, part and quantity in that order. Nothing is written
    /// unless the payload parses and all three inputs exist.
    pub fn on_scan_success(&mut self, decoded_text: &str, meta: &ScanResultMeta) -> ScanResult<()> {
        debug!(decoded_text, format = %meta.format, frame = meta.frame, "Code scanned");

        let payload = ScanPayload::parse(decoded_text)?;

        if let Some(missing) = FormField::ALL
            .iter()
            .map(|&field| self.ids.id(field))
            .find(|id| !self.form.has_field(id))
        {
            return Err(ScanError::UnknownField(missing.to_string()));
        }

        for field in FormField::ALL {
            self.form.set_value(self.ids.id(field), payload.value(field))?;
        }

        Ok(())
    }

    /// Run `scanner` until it stops, feeding every decode to the form.
    ///
    /// Rejected scans are logged and counted; they do not stop the session.
    pub fn run<Q: QrScanner + ?Sized>(
        &mut self,
        scanner: &mut Q,
        config: &ScannerConfig,
    ) -> ScanResult<ScanSession> {
        let mut session = ScanSession::default();

        scanner.start(config, &mut |text, meta| {
            match self.on_scan_success(text, meta) {
                Ok(()) => session.accepted += 1,
                Err(err) => {
                    warn!(error = %err, "Scan rejected, form left unchanged");
                    session.rejected += 1;
                    session.last_error = Some(err);
                }
            }
        })?;

        info!(
            accepted = session.accepted,
            rejected = session.rejected,
            "Scanner stopped"
        );

        Ok(session)
    }
}
