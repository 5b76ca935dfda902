// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The document operation surface: selection, text insertion, node and
//! fragment insertion, range deletion.
//!
//! All offsets are character positions in the plain-text projection. Every
//! operation re-establishes the model invariants via `normalize` before
//! returning, and leaves the cursor collapsed after the inserted content.
//!
//! Atomic nodes (mentions, emoticons, line breaks) cannot be split: the
//! cursor lands on their edges, typing at the right edge of an atomic node
//! starts a fresh unmarked run rather than extending the node, and a
//! deletion that touches any part of an atomic node removes all of it.

use super::nodes::{blocks_plain_len, Block, Document, Inline};

impl Document {
    /// Set the selection, clamped to the projection length.
    pub fn select(&mut self, start: usize, end: usize) {
        let len = self.plain_len();
        self.selection_start = start.min(len);
        self.selection_end = end.min(len);
    }

    /// Insert text at the cursor, replacing the selection if there is one.
    /// Newlines in the input become [`Inline::LineBreak`] nodes.
    pub fn insert_text(&mut self, text: &str) {
        self.delete_selected();
        let mut first = true;
        for segment in text.split('\n') {
            if !first {
                self.insert_inline_at_cursor(Inline::LineBreak);
            }
            if !segment.is_empty() {
                let offset = self.sel_start();
                insert_text_in_blocks(&mut self.blocks, offset, segment);
                let caret = offset + segment.chars().count();
                self.selection_start = caret;
                self.selection_end = caret;
            }
            first = false;
        }
        self.normalize();
    }

    /// Replace the current selection with text. Identical to
    /// [`Document::insert_text`]; kept as the name the UI layer uses for
    /// plain typing over a selection.
    pub fn replace_text(&mut self, text: &str) {
        self.insert_text(text);
    }

    /// Insert a single inline node at the cursor, replacing the selection
    /// if there is one. The cursor moves past the node. Inside a code
    /// block the node degrades to its plain text.
    pub fn insert_node(&mut self, inline: Inline) {
        self.delete_selected();
        self.insert_inline_at_cursor(inline);
        self.normalize();
    }

    /// Insert a custom emoji and move the cursor past it.
    pub fn insert_emoticon(
        &mut self,
        shortcode: impl Into<String>,
        resource_uri: impl Into<String>,
    ) {
        self.insert_node(Inline::emoticon(shortcode, resource_uri));
    }

    /// Insert a block fragment at the cursor, replacing the selection if
    /// there is one. Seeding an empty (or fully selected) document with
    /// parsed content goes through here.
    pub fn insert_fragment(&mut self, fragment: Vec<Block>) {
        self.delete_selected();
        if fragment.is_empty() {
            self.normalize();
            return;
        }
        if self.is_blank() {
            let caret = blocks_plain_len(&fragment);
            self.blocks = fragment;
            self.selection_start = caret;
            self.selection_end = caret;
            self.normalize();
            return;
        }
        if fragment.len() == 1 {
            if let Some(Block::Paragraph(inlines)) =
                fragment.first().cloned()
            {
                for inline in inlines {
                    self.insert_inline_at_cursor(inline);
                }
                self.normalize();
                return;
            }
        }
        let offset = self.sel_start();
        let idx = split_blocks_at(&mut self.blocks, offset);
        let frag_count = fragment.len();
        for (k, block) in fragment.into_iter().enumerate() {
            self.blocks.insert(idx + k, block);
        }
        let caret = blocks_plain_len(&self.blocks[..idx + frag_count]);
        self.selection_start = caret;
        self.selection_end = caret;
        self.normalize();
    }

    /// Delete a projection range, leaving the cursor at its start.
    pub fn delete_range(&mut self, start: usize, end: usize) {
        let len = self.plain_len();
        let (start, end) = (start.min(len), end.min(len));
        if start < end {
            delete_range_in_blocks(&mut self.blocks, start, end);
        }
        self.selection_start = start;
        self.selection_end = start;
        self.normalize();
    }

    /// Clear all content and return to the empty placeholder state.
    pub fn clear(&mut self) {
        self.blocks = vec![Block::Paragraph(vec![Inline::text("")])];
        self.selection_start = 0;
        self.selection_end = 0;
    }

    fn delete_selected(&mut self) {
        let (start, end) = (self.sel_start(), self.sel_end());
        if start < end {
            delete_range_in_blocks(&mut self.blocks, start, end);
        }
        self.selection_start = start;
        self.selection_end = start;
    }

    fn insert_inline_at_cursor(&mut self, inline: Inline) {
        let offset = self.sel_start();
        let advance = inline.plain_len();
        insert_inline_in_blocks(&mut self.blocks, offset, inline);
        let caret = offset + advance;
        self.selection_start = caret;
        self.selection_end = caret;
    }
}

/// Byte index of the `ci`-th character of `s` (or `s.len()` past the end).
fn char_to_byte(s: &str, ci: usize) -> usize {
    s.char_indices().nth(ci).map_or(s.len(), |(b, _)| b)
}

fn insert_text_in_blocks(
    blocks: &mut Vec<Block>,
    mut offset: usize,
    text: &str,
) {
    if blocks.is_empty() {
        blocks.push(Block::Paragraph(vec![Inline::text(text)]));
        return;
    }
    let last = blocks.len() - 1;
    for (i, block) in blocks.iter_mut().enumerate() {
        let len = block.plain_len();
        if offset <= len || i == last {
            insert_text_in_block(block, offset.min(len), text);
            return;
        }
        offset -= len + 1;
    }
}

fn insert_text_in_block(block: &mut Block, offset: usize, text: &str) {
    match block {
        Block::Paragraph(children) => {
            insert_text_in_inlines(children, offset, text)
        }
        Block::CodeBlock { text: code } => {
            let at = char_to_byte(code, offset);
            code.insert_str(at, text);
        }
        Block::Quote(children) => {
            insert_text_in_blocks(children, offset, text)
        }
        Block::List { items, .. } => {
            insert_text_in_blocks(items, offset, text)
        }
    }
}

fn insert_text_in_inlines(
    children: &mut Vec<Inline>,
    mut offset: usize,
    text: &str,
) {
    let mut i = 0;
    while i < children.len() {
        let len = children[i].plain_len();
        if children[i].is_atomic() {
            if offset == 0 {
                children.insert(i, Inline::text(text));
                return;
            }
            if offset <= len {
                let next_is_text =
                    matches!(children.get(i + 1), Some(Inline::Text { .. }));
                if next_is_text {
                    // let the following run take the insertion at its start
                    offset = len;
                } else {
                    children.insert(i + 1, Inline::text(text));
                    return;
                }
            }
        } else if let Inline::Text { text: run, .. } = &mut children[i] {
            if offset <= len {
                let at = char_to_byte(run, offset);
                run.insert_str(at, text);
                return;
            }
        }
        offset -= len;
        i += 1;
    }
    children.push(Inline::text(text));
}

fn insert_inline_in_blocks(
    blocks: &mut Vec<Block>,
    mut offset: usize,
    inline: Inline,
) {
    if blocks.is_empty() {
        blocks.push(Block::Paragraph(vec![inline]));
        return;
    }
    let last = blocks.len() - 1;
    for (i, block) in blocks.iter_mut().enumerate() {
        let len = block.plain_len();
        if offset <= len || i == last {
            insert_inline_in_block(block, offset.min(len), inline);
            return;
        }
        offset -= len + 1;
    }
}

fn insert_inline_in_block(block: &mut Block, offset: usize, inline: Inline) {
    match block {
        Block::Paragraph(children) => {
            insert_inline_in_inlines(children, offset, inline)
        }
        Block::CodeBlock { text: code } => {
            // structured inlines cannot live inside a code block
            let mut plain = String::new();
            inline.push_plain_text(&mut plain);
            let at = char_to_byte(code, offset);
            code.insert_str(at, &plain);
        }
        Block::Quote(children) => {
            insert_inline_in_blocks(children, offset, inline)
        }
        Block::List { items, .. } => {
            insert_inline_in_blocks(items, offset, inline)
        }
    }
}

fn insert_inline_in_inlines(
    children: &mut Vec<Inline>,
    mut offset: usize,
    inline: Inline,
) {
    let mut i = 0;
    while i < children.len() {
        let len = children[i].plain_len();
        if offset == 0 {
            children.insert(i, inline);
            return;
        }
        if offset < len {
            if let Inline::Text { text, marks } = &mut children[i] {
                let at = char_to_byte(text, offset);
                let tail = text.split_off(at);
                let marks = *marks;
                children.insert(i + 1, inline);
                children.insert(i + 2, Inline::text_marked(tail, marks));
            } else {
                children.insert(i + 1, inline);
            }
            return;
        }
        if offset == len {
            children.insert(i + 1, inline);
            return;
        }
        offset -= len;
        i += 1;
    }
    children.push(inline);
}

fn delete_range_in_blocks(blocks: &mut Vec<Block>, start: usize, end: usize) {
    if start >= end || blocks.is_empty() {
        return;
    }
    // Spans in the projection space before any mutation.
    let mut spans = Vec::with_capacity(blocks.len());
    let mut pos = 0;
    for block in blocks.iter() {
        let len = block.plain_len();
        spans.push((pos, len));
        pos += len + 1;
    }

    for (i, block) in blocks.iter_mut().enumerate() {
        let (b_start, b_len) = spans[i];
        if end <= b_start || start >= b_start + b_len {
            continue;
        }
        let local_start = start.saturating_sub(b_start);
        let local_end = (end - b_start).min(b_len);
        if local_start < local_end {
            delete_in_block(block, local_start, local_end);
        }
    }

    // Deleted inter-block separators merge their neighbours, right to left
    // so earlier indices stay valid.
    for i in (0..blocks.len().saturating_sub(1)).rev() {
        let sep = spans[i].0 + spans[i].1;
        if sep >= start && sep < end {
            merge_adjacent_blocks(blocks, i);
        }
    }
}

fn delete_in_block(block: &mut Block, start: usize, end: usize) {
    match block {
        Block::Paragraph(children) => {
            delete_in_inlines(children, start, end)
        }
        Block::CodeBlock { text } => {
            let from = char_to_byte(text, start);
            let to = char_to_byte(text, end);
            text.replace_range(from..to, "");
        }
        Block::Quote(children) => {
            delete_range_in_blocks(children, start, end)
        }
        Block::List { items, .. } => {
            delete_range_in_blocks(items, start, end)
        }
    }
}

fn delete_in_inlines(children: &mut Vec<Inline>, start: usize, end: usize) {
    let mut pos = 0;
    let mut i = 0;
    while i < children.len() {
        let len = children[i].plain_len();
        let c_start = pos;
        let c_end = pos + len;
        pos = c_end;
        if c_end <= start || c_start >= end {
            i += 1;
            continue;
        }
        if children[i].is_atomic() {
            children.remove(i);
            continue;
        }
        if let Inline::Text { text, .. } = &mut children[i] {
            let local_start = start.saturating_sub(c_start);
            let local_end = (end - c_start).min(len);
            let from = char_to_byte(text, local_start);
            let to = char_to_byte(text, local_end);
            text.replace_range(from..to, "");
        }
        i += 1;
    }
}

fn merge_adjacent_blocks(blocks: &mut Vec<Block>, i: usize) {
    let both_paragraphs = matches!(&blocks[i], Block::Paragraph(_))
        && matches!(&blocks[i + 1], Block::Paragraph(_));
    let both_code = matches!(&blocks[i], Block::CodeBlock { .. })
        && matches!(&blocks[i + 1], Block::CodeBlock { .. });

    if both_paragraphs {
        if let Block::Paragraph(tail) = blocks.remove(i + 1) {
            if let Block::Paragraph(head) = &mut blocks[i] {
                head.extend(tail);
            }
        }
    } else if both_code {
        if let Block::CodeBlock { text: tail } = blocks.remove(i + 1) {
            if let Block::CodeBlock { text } = &mut blocks[i] {
                text.push_str(&tail);
            }
        }
    } else {
        // heterogeneous neighbours only collapse when one side is an
        // emptied paragraph
        if matches!(&blocks[i + 1], Block::Paragraph(_))
            && blocks[i + 1].plain_len() == 0
        {
            blocks.remove(i + 1);
        } else if matches!(&blocks[i], Block::Paragraph(_))
            && blocks[i].plain_len() == 0
        {
            blocks.remove(i);
        }
    }
}

fn split_blocks_at(blocks: &mut Vec<Block>, mut offset: usize) -> usize {
    let mut i = 0;
    while i < blocks.len() {
        let len = blocks[i].plain_len();
        if offset == 0 {
            return i;
        }
        if offset < len {
            match &mut blocks[i] {
                Block::Paragraph(children) => {
                    let tail = split_inlines_at(children, offset);
                    blocks.insert(i + 1, Block::Paragraph(tail));
                }
                Block::CodeBlock { text } => {
                    let at = char_to_byte(text, offset);
                    let tail = text.split_off(at);
                    blocks.insert(i + 1, Block::CodeBlock { text: tail });
                }
                // container blocks are not split; insert after them
                Block::Quote(_) | Block::List { .. } => {}
            }
            return i + 1;
        }
        if offset == len {
            return i + 1;
        }
        offset -= len + 1;
        i += 1;
    }
    blocks.len()
}

fn split_inlines_at(children: &mut Vec<Inline>, mut offset: usize) -> Vec<Inline> {
    let mut i = 0;
    while i < children.len() {
        let len = children[i].plain_len();
        if offset == 0 {
            return children.split_off(i);
        }
        if offset < len {
            if let Inline::Text { text, marks } = &mut children[i] {
                let at = char_to_byte(text, offset);
                let tail_text = text.split_off(at);
                let marks = *marks;
                let mut tail = children.split_off(i + 1);
                tail.insert(0, Inline::text_marked(tail_text, marks));
                return tail;
            }
            return children.split_off(i + 1);
        }
        offset -= len;
        i += 1;
    }
    Vec::new()
}
