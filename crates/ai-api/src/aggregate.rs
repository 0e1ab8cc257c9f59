use ai_types::ApiError;
use futures_core::Stream;
use futures_util::StreamExt;

/// Drain a fragment stream into one string.
///
/// Fragments are concatenated in order with no separator. The first error
/// is returned unchanged and the rest of the stream is left unread.
pub async fn aggregate<S>(stream: &mut S) -> Result<String, ApiError>
where
    S: Stream<Item = Result<String, ApiError>> + Unpin + ?Sized,
{
    let mut text = String::new();
    while let Some(fragment) = stream.next().await {
        text.push_str(&fragment?);
    }
    Ok(text)
}
