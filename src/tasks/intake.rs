//! Hairstyle request intake: credits, photo staging, task fan-out

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::ledger::credits::{CreditLedger, CreditReceipt};
use crate::ledger::error::LedgerError;
use crate::ledger::store::TaskStore;
use crate::observability::Metrics;
use crate::storage::relocate::{AssetRelocator, RelocateError};

use super::model::{
    Gpt4oRequest, KontextRequest, Provider, ProviderRequest, Task, TaskExt, TaskStatus,
};
use super::prompt::{self, Gpt4oPromptArgs};

/// Storage namespace for staged input photos
pub const UPLOAD_NAMESPACE: &str = "uploads/hairstyle";

const GPT4O_ASPECT: &str = "2:3";
const GPT4O_VARIANTS: &str = "4";
const KONTEXT_ASPECT: &str = "3:4";
const KONTEXT_MODEL: &str = "flux-kontext-pro";
const KONTEXT_OUTPUT_FORMAT: &str = "png";

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("no styles selected")]
    NoStyles,

    #[error("failed to stage input photo: {0}")]
    InputPhoto(#[from] RelocateError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// One requested style variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleChoice {
    pub name: String,
    /// Reference image passed to the provider, when the catalog has one
    #[serde(default)]
    pub cover: Option<String>,
}

/// Requested hair color. `value` is the concrete hex; colors without a
/// value ("keep current") mean no color change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorChoice {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
}

/// A full intake submission, independent of the HTTP surface
#[derive(Debug, Clone)]
pub struct HairstyleOrder {
    pub photo_url: String,
    pub provider: Provider,
    pub styles: Vec<StyleChoice>,
    pub color: ColorChoice,
    pub detail: Option<String>,
}

/// Accepted intake: the created rows plus the debit receipt
#[derive(Debug)]
pub struct IntakeReceipt {
    pub tasks: Vec<Task>,
    pub credits: CreditReceipt,
}

/// Turns an accepted order into pending task rows
pub struct TaskIntake {
    store: Arc<TaskStore>,
    credits: Arc<CreditLedger>,
    relocator: Arc<dyn AssetRelocator>,
    metrics: Arc<Metrics>,
    callback_url: Option<String>,
}

impl TaskIntake {
    pub fn new(
        store: Arc<TaskStore>,
        credits: Arc<CreditLedger>,
        relocator: Arc<dyn AssetRelocator>,
        metrics: Arc<Metrics>,
        callback_url: Option<String>,
    ) -> Self {
        Self {
            store,
            credits,
            relocator,
            metrics,
            callback_url,
        }
    }

    /// Accept an order: debit one credit per style, stage the photo once,
    /// then persist one pending task per style in a single atomic batch.
    ///
    /// The debit happens first. A failure after it (photo fetch, storage)
    /// surfaces to the caller with the credits already spent.
    pub async fn create_hairstyle_tasks(
        &self,
        user_id: &str,
        order: HairstyleOrder,
    ) -> Result<IntakeReceipt, IntakeError> {
        if order.styles.is_empty() {
            return Err(IntakeError::NoStyles);
        }

        let required = order.styles.len() as i64;
        let receipt = self.credits.debit(user_id, required)?;
        self.metrics.credits_debited(required as u64);

        let staged_name = Uuid::now_v7().to_string();
        let input_url = self
            .relocator
            .relocate(
                &order.photo_url,
                UPLOAD_NAMESPACE,
                &staged_name,
                photo_ext(&order.photo_url),
            )
            .await?;
        debug!(input_url, "Staged input photo");

        let now = Utc::now();
        let tasks: Vec<Task> = order
            .styles
            .iter()
            .map(|style| self.build_task(user_id, &order, style, &input_url, now))
            .collect();
        let tasks = self.store.insert_batch(tasks)?;
        self.metrics.tasks_created(tasks.len() as u64);

        info!(
            user_id,
            count = tasks.len(),
            provider = %order.provider,
            "Accepted hairstyle order"
        );
        Ok(IntakeReceipt {
            tasks,
            credits: receipt,
        })
    }

    fn build_task(
        &self,
        user_id: &str,
        order: &HairstyleOrder,
        style: &StyleChoice,
        input_url: &str,
        now: DateTime<Utc>,
    ) -> Task {
        let colored = order.color.value.is_some();
        let haircolor = colored.then(|| order.color.name.clone());

        let (aspect, request_param) = match order.provider {
            Provider::Kie4o => {
                // Input photo first; references follow in prompt order
                let mut files_url = vec![input_url.to_string()];
                if let Some(cover) = &style.cover {
                    files_url.push(cover.clone());
                }
                if colored {
                    if let Some(cover) = &order.color.cover {
                        files_url.push(cover.clone());
                    }
                }
                let prompt = prompt::gpt4o_prompt(&Gpt4oPromptArgs {
                    hairstyle: &style.name,
                    haircolor: haircolor.as_deref(),
                    haircolor_hex: order.color.value.as_deref(),
                    with_style_reference: style.cover.is_some(),
                    with_color_reference: colored && order.color.cover.is_some(),
                    detail: order.detail.as_deref(),
                });
                (
                    GPT4O_ASPECT,
                    ProviderRequest::Gpt4o(Gpt4oRequest {
                        files_url,
                        prompt,
                        size: GPT4O_ASPECT.to_string(),
                        n_variants: GPT4O_VARIANTS.to_string(),
                        call_back_url: self.callback_url.clone(),
                    }),
                )
            }
            Provider::KieKontext => {
                let prompt = prompt::kontext_prompt(
                    &style.name,
                    haircolor.as_deref(),
                    order.detail.as_deref(),
                );
                (
                    KONTEXT_ASPECT,
                    ProviderRequest::Kontext(KontextRequest {
                        input_image: input_url.to_string(),
                        prompt,
                        aspect_ratio: KONTEXT_ASPECT.to_string(),
                        model: KONTEXT_MODEL.to_string(),
                        output_format: KONTEXT_OUTPUT_FORMAT.to_string(),
                        call_back_url: self.callback_url.clone(),
                    }),
                )
            }
        };

        Task {
            task_no: Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            task_id: None,
            status: TaskStatus::Pending,
            provider: order.provider,
            request_param,
            input_params: json!({
                "photo": input_url,
                "hairstyle": style,
                "hair_color": order.color,
                "detail": order.detail,
            }),
            ext: TaskExt {
                hairstyle: style.name.clone(),
                haircolor,
            },
            aspect: aspect.to_string(),
            estimated_start_at: now,
            created_at: now,
            started_at: None,
            completed_at: None,
            result_url: None,
            result_data: None,
            fail_reason: None,
        }
    }
}

/// File extension for the staged copy, taken from the source URL path.
/// Falls back to "jpg" when the URL has no usable extension.
fn photo_ext(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or("jpg")
}
