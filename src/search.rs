//! Navigation inside searchable items.

use crate::{buffer::IoBuffer, errors::*, item::ItemHeader};
use std::io::Write;

/// Result of [`IoBuffer::search_sub_item`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The cursor is at the header of this sub-item.
    Found(ItemHeader),
    /// No direct sub-item of the wanted type.
    NotFound,
    /// The item is not searchable; decode it sequentially instead.
    CannotSearch,
}

impl SearchOutcome {
    pub fn found(&self) -> Option<&ItemHeader> {
        match self {
            SearchOutcome::Found(header) => Some(header),
            _ => None,
        }
    }
}

impl IoBuffer {
    /// Looks for the next direct sub-item of type `wanted` (0 for any) inside
    /// the item being read, skipping the bodies of the others.
    ///
    /// The search starts at the cursor; use [`rewind_item`](IoBuffer::rewind_item)
    /// to search from the first sub-item again. Sub-items of `header` that are
    /// still open are abandoned first.
    pub fn search_sub_item(&mut self, header: &ItemHeader, wanted: u16) -> Result<SearchOutcome> {
        if header.level >= self.frames.len() {
            return Err(Error::InvalidState("item is not being read"));
        }
        if !header.searchable {
            return Ok(SearchOutcome::CannotSearch);
        }
        if let Some(child) = self.frames.get(header.level + 1) {
            self.pos = child.end();
            self.frames.truncate(header.level + 1);
        }
        loop {
            let sub = match self.get_item_begin(0) {
                Ok(sub) => sub,
                Err(Error::EndOfItem) => return Ok(SearchOutcome::NotFound),
                Err(e) => return Err(e),
            };
            if wanted == 0 || sub.item_type == wanted {
                self.unget_item(&sub)?;
                return Ok(SearchOutcome::Found(sub));
            }
            self.get_item_end(&sub)?;
        }
    }

    /// Moves the cursor back to the start of the body of `header`, closing any
    /// of its sub-items still being read.
    pub fn rewind_item(&mut self, header: &ItemHeader) -> Result<()> {
        if header.level >= self.frames.len() {
            return Err(Error::InvalidState("item is not being read"));
        }
        self.frames.truncate(header.level + 1);
        self.pos = self.frames[header.level].data_start;
        Ok(())
    }

    /// Writes one line per sub-item of `header`, recursing into searchable
    /// sub-items down to nesting level `max_depth`. The cursor is rewound to the
    /// start of the body afterwards.
    pub fn list_sub_items<W: Write + ?Sized>(
        &mut self,
        header: &ItemHeader,
        max_depth: usize,
        verbosity: u32,
        out: &mut W,
    ) -> Result<()> {
        self.rewind_item(header)?;
        let listed = self.list_level(max_depth, verbosity, out);
        self.rewind_item(header)?;
        listed
    }

    fn list_level<W: Write + ?Sized>(&mut self, max_depth: usize, verbosity: u32, out: &mut W) -> Result<()> {
        loop {
            let sub = match self.get_item_begin(0) {
                Ok(sub) => sub,
                Err(Error::EndOfItem) => return Ok(()),
                Err(e) => return Err(e),
            };
            writeln!(
                out,
                "{}{}{}",
                "  ".repeat(sub.level),
                sub,
                self.diag.type_label(sub.item_type, verbosity)
            )?;
            if sub.searchable && sub.level < max_depth {
                self.list_level(max_depth, verbosity, out)?;
            }
            self.get_item_end(&sub)?;
        }
    }
}
