use serde::Serialize;

use luw_core::records::{EntityKind, Product, User};

pub const BACK_LINK: &str = "/";

/// JSON body shared by every route: the payload's fields at the top level,
/// a link back to the index and an `error` string on failure.
#[derive(Serialize, Debug)]
pub struct Envelope<T> {
    #[serde(flatten)]
    pub body: Option<T>,
    pub back_link: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(body: T) -> Self {
        Self {
            body: Some(body),
            back_link: BACK_LINK,
            error: None,
        }
    }

    pub fn failed(message: String) -> Self {
        Self {
            body: None,
            back_link: BACK_LINK,
            error: Some(message),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
pub enum Sample {
    Users(Vec<User>),
    Products(Vec<Product>),
}

/// What `/records/{kind}` returns.
#[derive(Serialize, Debug)]
pub struct RecordsView {
    pub kind: EntityKind,
    pub total: u64,
    pub sample: Sample,
}

#[derive(Serialize, Debug)]
pub struct ResetView {
    pub cleared: Vec<luw_core::runner::KindReset>,
}
