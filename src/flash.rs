use serde::{Deserialize, Serialize};

use crate::models::session::Session;

/// A one-shot message surfaced on the next page view and then discarded.
///
/// Each setter overwrites its slot, so one `Flash` carries at most one
/// message per kind; queue several `Flash` instances for several messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Flash {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Flash {
    /// Creates an empty flash.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the success message.
    pub fn success(&mut self, msg: &str) {
        self.success = Some(msg.to_string());
    }

    /// Sets the notice message.
    pub fn notice(&mut self, msg: &str) {
        self.notice = Some(msg.to_string());
    }

    /// Sets the error message.
    pub fn error(&mut self, msg: &str) {
        self.error = Some(msg.to_string());
    }

    /// Queues this flash on the session. The session must still be saved for
    /// the flash to survive to the next request.
    ///
    /// A flash that fails to serialize is dropped silently; flash display is
    /// best-effort and never a hard dependency.
    pub fn add(&self, session: &mut Session) {
        match serde_json::to_string(self) {
            Ok(payload) => session.push_flash(payload),
            Err(e) => tracing::warn!("failed to serialize flash: {}", e),
        }
    }

    /// Pops the first queued flash from the session, if any.
    ///
    /// At most one payload is consumed per call. A payload that fails to
    /// deserialize is logged and swallowed, never propagated.
    pub fn get(session: &mut Session) -> Option<Flash> {
        let payload = session.pop_flash()?;
        match serde_json::from_str(&payload) {
            Ok(flash) => Some(flash),
            Err(e) => {
                tracing::warn!("failed to deserialize flash: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::SessionOptions;

    fn session() -> Session {
        Session::new("_warden", SessionOptions::default())
    }

    #[test]
    fn one_add_one_get() {
        let mut s = session();
        let mut flash = Flash::new();
        flash.success("Successfully created your account");
        flash.add(&mut s);

        let got = Flash::get(&mut s).expect("queued flash");
        assert_eq!(got.success.as_deref(), Some("Successfully created your account"));
        assert!(got.notice.is_none());

        // One-shot: the queue is now empty.
        assert!(Flash::get(&mut s).is_none());
    }

    #[test]
    fn setters_overwrite_within_one_flash() {
        let mut flash = Flash::new();
        flash.error("first");
        flash.error("second");
        assert_eq!(flash.error.as_deref(), Some("second"));
    }

    #[test]
    fn queued_flashes_pop_in_order() {
        let mut s = session();
        let mut first = Flash::new();
        first.notice("one");
        first.add(&mut s);
        let mut second = Flash::new();
        second.notice("two");
        second.add(&mut s);

        assert_eq!(Flash::get(&mut s).unwrap().notice.as_deref(), Some("one"));
        assert_eq!(Flash::get(&mut s).unwrap().notice.as_deref(), Some("two"));
        assert!(Flash::get(&mut s).is_none());
    }

    #[test]
    fn corrupt_payload_is_swallowed() {
        let mut s = session();
        s.push_flash("{not json".to_string());
        assert!(Flash::get(&mut s).is_none());
    }
}
