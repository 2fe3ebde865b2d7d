use crate::analysis::Submission;
use crate::images::Upload;
use serde::Deserialize;
use std::fmt::Debug;

/// An uploaded file, encoded as base 64 (a bare string or a data URL)
#[derive(Deserialize)]
pub struct B64Upload {
    pub name: String,
    pub image: String,
}

impl Debug for B64Upload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "B64Upload {{ name: {:?}, image: <data> }}", self.name)
    }
}

/// The analyze page's full input state
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub images: Vec<B64Upload>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub submit: bool,
}

impl From<AnalyzeRequest> for Submission {
    fn from(req: AnalyzeRequest) -> Submission {
        Submission {
            uploads: req
                .images
                .into_iter()
                .map(|img| Upload::from_base64(img.name, &img.image))
                .collect(),
            text: req.text,
            submit: req.submit,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RelayRequest {
    #[serde(default)]
    pub input: String,
}
