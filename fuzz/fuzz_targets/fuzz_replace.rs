#![no_main]

use libfuzzer_sys::fuzz_target;
use paste_uploader::editor::{Editor, TextBuffer};
use paste_uploader::replace::Locator;
use std::panic::AssertUnwindSafe;

// Input layout: target, replacement and document separated by NUL bytes,
// with the first byte choosing an optional line hint.
fuzz_target!(|data: &[u8]| {
    let Some((&hint, rest)) = data.split_first() else {
        return;
    };
    let Ok(input) = std::str::from_utf8(rest) else {
        return;
    };
    let mut parts = input.splitn(3, '\0');
    let (Some(target), Some(replacement), Some(content)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return;
    };

    let locator = if hint == 0 {
        Locator::new()
    } else {
        Locator::with_hint(hint as usize - 1)
    };

    let mut buf = TextBuffer::new(content);
    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        locator.replace(&mut buf, target, replacement)
    }));

    let Ok(result) = result else {
        panic!("replace panicked");
    };

    match result {
        None => assert_eq!(buf.text(), content, "no-op must not modify the document"),
        Some(at) => {
            let before_lines = content.split('\n').count();
            let inserted = replacement.matches('\n').count();
            assert_eq!(buf.line_count(), before_lines + inserted);
            assert!(at.line < before_lines, "match line out of range");

            let trimmed = target.trim();
            assert!(!trimmed.is_empty(), "empty target must not match");
            assert!(!trimmed.contains('\n'), "match must not span lines");
            let expected_len = content.len() - trimmed.len() + replacement.len();
            assert_eq!(buf.text().len(), expected_len);
        }
    }
});
