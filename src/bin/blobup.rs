use anyhow::Result;
use blobup::cli::{
    actions::{self, Action},
    start::start,
};

#[tokio::main]
async fn main() -> Result<()> {
    let (endpoint, action, globals) = start()?;

    match action {
        Action::Put { files } => actions::put::handle(&endpoint, files, globals).await,
        Action::Import { urls } => actions::import::handle(&endpoint, urls, globals).await,
    }
}
