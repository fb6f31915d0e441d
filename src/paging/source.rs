//! Extension points a concrete paged list supplies.

use async_trait::async_trait;

use super::state::{PagingState, RequestType};

/// Where pages come from.
///
/// A fetch runs `get_request` → `get_items` → `page_to_items`. Any `Err`
/// along the way becomes a `Failed` / `FailedNextPage` state; it is never
/// returned to the caller of `refresh` or `load_next_page`. The container
/// imposes no timeout, so sources carry their own.
#[async_trait]
pub trait PageSource: Send + Sync + 'static {
    type Item: Clone + Send + Sync + 'static;
    type Request: Send + Sync + 'static;
    type Page: Send + Sync + 'static;

    /// Build the request for the next fetch of the given type.
    async fn get_request(&self, request_type: RequestType) -> anyhow::Result<Self::Request>;

    /// Fetch one raw page.
    async fn get_items(&self, request: &Self::Request) -> anyhow::Result<Self::Page>;

    /// Extract the list items from a fetched page.
    async fn page_to_items(
        &self,
        request: &Self::Request,
        page: &Self::Page,
    ) -> anyhow::Result<Vec<Self::Item>>;

    /// Whether `page` is the final one. Defaults to "nothing came back".
    fn is_last_page(&self, _request: &Self::Request, _page: &Self::Page, items: &[Self::Item]) -> bool {
        items.is_empty()
    }

    /// Whether `state` allows starting a next-page fetch.
    fn can_load_next_page(&self, state: &PagingState<Self::Item>) -> bool {
        state.can_load_next_page()
    }
}

/// Items of one fetched page, plus whether the source reported it as last.
pub(crate) struct FetchedPage<T> {
    pub(crate) items: Vec<T>,
    pub(crate) is_last: bool,
}

pub(crate) async fn fetch_page<S: PageSource>(
    source: &S,
    request_type: RequestType,
) -> anyhow::Result<FetchedPage<S::Item>> {
    let request = source.get_request(request_type).await?;
    let page = source.get_items(&request).await?;
    let items = source.page_to_items(&request, &page).await?;
    let is_last = source.is_last_page(&request, &page, &items);
    Ok(FetchedPage { items, is_last })
}
