use super::traits::OutboundMessage;

/// Positional split of `text` into slices of at most `max_chars` characters.
///
/// No attempt is made to respect word or line boundaries. The iterator is
/// `Clone`, so a consumed sequence can be restarted from any saved copy.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    rest: &'a str,
    max_chars: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() || self.max_chars == 0 {
            return None;
        }
        let split_at = self
            .rest
            .char_indices()
            .nth(self.max_chars)
            .map_or(self.rest.len(), |(index, _)| index);
        let (chunk, rest) = self.rest.split_at(split_at);
        self.rest = rest;
        Some(chunk)
    }
}

#[must_use]
pub fn chunk_message(text: &str, max_chars: usize) -> Chunks<'_> {
    Chunks {
        rest: text,
        max_chars,
    }
}

/// One outbound piece of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryChunk<'a> {
    pub text: &'a str,
    pub reply_to: Option<&'a str>,
}

impl DeliveryChunk<'_> {
    pub fn to_outbound(&self, channel_id: &str) -> OutboundMessage {
        OutboundMessage {
            channel_id: channel_id.to_string(),
            content: self.text.to_string(),
            reply_to: self.reply_to.map(str::to_string),
        }
    }
}

/// A reply ready for delivery. Iterating it (any number of times) yields
/// the chunks in order with the reply link on the first chunk only.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryPlan<'a> {
    text: &'a str,
    max_chars: usize,
    reply_to: Option<&'a str>,
}

impl<'a> DeliveryPlan<'a> {
    pub fn new(text: &'a str, max_chars: usize, reply_to: Option<&'a str>) -> Self {
        Self {
            text,
            max_chars,
            reply_to,
        }
    }

    pub fn iter(&self) -> DeliveryIter<'a> {
        DeliveryIter {
            chunks: chunk_message(self.text, self.max_chars),
            reply_to: self.reply_to,
        }
    }
}

impl<'a> IntoIterator for &DeliveryPlan<'a> {
    type Item = DeliveryChunk<'a>;
    type IntoIter = DeliveryIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct DeliveryIter<'a> {
    chunks: Chunks<'a>,
    reply_to: Option<&'a str>,
}

impl<'a> Iterator for DeliveryIter<'a> {
    type Item = DeliveryChunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let text = self.chunks.next()?;
        Some(DeliveryChunk {
            text,
            reply_to: self.reply_to.take(),
        })
    }
}
