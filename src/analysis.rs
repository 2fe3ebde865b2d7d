//! The analyze front end's request handler. Every interaction (a change to
//! the uploaded files, or a press of the submit button) arrives as one
//! `Submission` holding the whole input state, and is answered with a `Page`.

use crate::config::{ImageSettings, Settings};
use crate::gemini::{ModelClient, Prompt};
use crate::images::{self, Thumbnail, Upload, UploadError};
use crate::page::*;
use actix_web::web;
use tracing::*;

/// Everything the user has entered so far
#[derive(Debug, Default)]
pub struct Submission {
    /// Uploads in the order they were picked. Uploads that could not even be
    /// read (e.g. bad base64) are carried as errors.
    pub uploads: Vec<Result<Upload, UploadError>>,
    pub text: String,

    /// Whether the submit button was pressed
    pub submit: bool,
}

/// The outcome of the image work for one interaction
#[derive(Debug)]
pub struct Prepared {
    pub page: Page,

    /// Set when the model should be called. The page then already ends with
    /// the results heading.
    pub prompt: Option<Prompt>,
}

/// Decode, preview and encode a submission. CPU bound, so `analyze` runs it
/// on the blocking pool.
pub fn prepare(settings: &ImageSettings, default_prompt: &str, submission: Submission) -> Prepared {
    let mut page = Page::new(ANALYZE_TITLE);
    let text = submission.text.trim();

    if submission.uploads.is_empty() {
        if !submission.submit {
            page.text(UPLOAD_HINT);
            return Prepared { page, prompt: None };
        }
        if text.is_empty() {
            page.error(NO_INPUT);
            return Prepared { page, prompt: None };
        }
    }

    // Decode every upload, reporting failures inline
    let mut decoded = Vec::new();
    let mut thumbnails = Vec::new();
    for upload in submission.uploads {
        let result = upload.and_then(|upload| {
            let name = upload.name.clone();
            images::decode(upload, &settings.accepted_extensions)
                .map_err(|source| UploadError { name, source })
        });

        let image = match result {
            Ok(image) => image,
            Err(e) => {
                warn!("rejected upload: {e}");
                page.error(e.to_string());
                continue;
            }
        };

        let small = images::thumbnail(&image.image, settings.thumbnail_size);
        match Thumbnail::new(format!("Image: {}", image.name), &small) {
            Ok(thumb) => thumbnails.push(thumb),
            Err(e) => page.error(format!("Error loading image {}: {e}", image.name)),
        }
        decoded.push(image);
    }
    page.thumbnails(thumbnails);

    if !submission.submit {
        return Prepared { page, prompt: None };
    }

    // Encode for the model. Originals are sent, not thumbnails.
    let mut encoded = Vec::with_capacity(decoded.len());
    for image in &decoded {
        match images::encode_png(&image.image) {
            Ok(e) => encoded.push(e),
            Err(e) => page.error(format!("Error loading image {}: {e}", image.name)),
        }
    }

    if encoded.is_empty() && text.is_empty() {
        page.error(NO_INPUT);
        return Prepared { page, prompt: None };
    }

    page.heading(RESULTS_HEADING);
    let prompt = Prompt {
        text: if text.is_empty() {
            default_prompt.to_string()
        } else {
            text.to_string()
        },
        images: encoded,
    };
    Prepared {
        page,
        prompt: Some(prompt),
    }
}

/// Handle one interaction. Never fails: every problem becomes a block on the
/// returned page.
pub async fn analyze(settings: &Settings, client: &dyn ModelClient, submission: Submission) -> Page {
    let image_settings = settings.images.clone();
    let default_prompt = settings.model.default_prompt.clone();
    let prepared = web::block(move || prepare(&image_settings, &default_prompt, submission)).await;

    let Prepared { mut page, prompt } = match prepared {
        Ok(prepared) => prepared,
        Err(e) => {
            error!("image processing failed: {e}");
            let mut page = Page::new(ANALYZE_TITLE);
            page.error(format!("Error processing the request: {e}"));
            return page;
        }
    };
    let Some(prompt) = prompt else {
        return page;
    };

    info!("analyzing {} image(s)", prompt.images.len());
    match client.generate(&prompt).await {
        Ok(reply) => match reply.text() {
            Some(text) => page.text(text),
            None => page.text(UNSAFE_CONTENT),
        },
        Err(e) => {
            error!("model call failed: {e}");
            page.error(format!("Error processing the request: {e}"));
        }
    }

    page
}
