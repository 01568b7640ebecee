use serde::Serialize;
use uuid::Uuid;

/// Short correlation id shared by the PDF file names and the response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ReferenceId(String);

impl ReferenceId {
    pub const LEN: usize = 8;

    /// Fresh id from the first eight hex digits of a random UUID.
    pub fn generate() -> Self {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(Self::LEN);
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the rendered sign-off document.
    pub fn document_filename(&self) -> String {
        format!("OSD_{}.pdf", self.0)
    }

    /// File name the companion PDF is stored under.
    pub fn companion_filename(&self) -> String {
        format!("OSD_{}_BOL.pdf", self.0)
    }

    /// File name the companion PDF is attached to email under.
    pub fn companion_attachment_name(&self) -> String {
        format!("BOL_{}.pdf", self.0)
    }
}

impl std::fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
