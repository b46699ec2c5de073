// SPDX-License-Identifier: MPL-2.0

mod client;
mod normalize;
mod transport;
mod types;

pub use client::{ClientError, GraphClient};
pub use normalize::{NormalizeError, normalize, parse_graph_time};
pub use transport::{GraphTransport, ReqwestTransport};
pub use types::{
    GraphPage, Paging, Post, Published, RawAttachment, RawAttachments, RawImage, RawMedia,
    RawPost, RawResource, RawShares, RawSummary, RawSummaryEdge, ResourceMetadata,
};

#[cfg(test)]
pub(crate) use transport::scripted::ScriptedTransport;
