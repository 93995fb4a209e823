use ahash::AHashMap;

/// Interns tag strings into dense ids, in first-seen order.
#[derive(Debug, Default, Clone)]
pub struct TagDictionary {
    ids: AHashMap<String, u32>,
    strings: Vec<String>,
}

impl TagDictionary {
    pub fn new() -> Self { Self::default() }

    /// Id of `s`, assigning the next free id on first sight. `None` once
    /// every `u32` id is taken.
    pub fn intern(&mut self, s: &str) -> Option<u32> {
        if let Some(&id) = self.ids.get(s) { return Some(id) }
        let id = u32::try_from(self.strings.len()).ok()?;
        self.strings.push(s.to_string());
        self.ids.insert(s.to_string(), id);
        Some(id)
    }

    #[inline] pub fn get(&self, id: u32) -> Option<&str> { self.strings.get(id as usize).map(String::as_str) }

    #[inline] pub fn len(&self) -> usize { self.strings.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.strings.is_empty() }

    /// Strings in id order.
    #[inline] pub fn strings(&self) -> &[String] { &self.strings }
}
