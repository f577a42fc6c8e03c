use crate::stream::{Stream, StreamType};

/// Picks what a plain client would play: the highest bitrate video, the
/// first audio and the first text stream, in that order.
///
/// Trickmode streams are never picked. A missing category is simply absent
/// from the result.
pub fn default_streams(streams: &[Stream]) -> Vec<Stream> {
    let first_of =
        |stream_type: StreamType| streams.iter().find(|s| s.stream_type() == stream_type);

    // `max_by_key` keeps the last maximum, ties must go to the first one
    let video = streams
        .iter()
        .filter(|s| s.stream_type() == StreamType::Video)
        .fold(None::<&Stream>, |best, s| match best {
            Some(best) if best.bitrate() >= s.bitrate() => Some(best),
            _ => Some(s),
        });

    [video, first_of(StreamType::Audio), first_of(StreamType::Text)]
        .into_iter()
        .flatten()
        .cloned()
        .collect()
}
