use serde::de::{Deserialize, SeqAccess};

/// Extract the next element from a [`SeqAccess`] sequence, failing with a `missing_field`
/// error naming the element if the sequence is exhausted.
pub fn extract_next<'de, SeqAccessor, Target>(
    sequence: &mut SeqAccessor,
    name: &'static str,
) -> Result<Target, SeqAccessor::Error>
where
    SeqAccessor: SeqAccess<'de>,
    Target: Deserialize<'de>,
{
    sequence
        .next_element::<Target>()?
        .ok_or_else(|| serde::de::Error::missing_field(name))
}
