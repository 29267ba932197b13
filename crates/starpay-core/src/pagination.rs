// Page-number window for pagination controls.

use std::fmt;

/// Collections this short are shown in full.
const FULL_WINDOW: u32 = 7;

/// One slot in a pagination control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(u32),
    Ellipsis,
}

impl fmt::Display for PageItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page(n) => write!(f, "{n}"),
            Self::Ellipsis => f.write_str("…"),
        }
    }
}

/// Visible page numbers for `current` out of `total_pages`.
///
/// Up to seven pages are listed in full. Beyond that the first two and
/// last two pages are always shown, together with the neighbours of
/// `current`, and an ellipsis stands in for each gap.
pub fn window(current: u32, total_pages: u32) -> Vec<PageItem> {
    if total_pages <= FULL_WINDOW {
        return (1..=total_pages).map(PageItem::Page).collect();
    }

    let mut items = vec![PageItem::Page(1), PageItem::Page(2)];

    if current > 4 {
        items.push(PageItem::Ellipsis);
    }

    let start = current.saturating_sub(1).max(3);
    let end = current.saturating_add(1).min(total_pages - 2);
    items.extend((start..=end).map(PageItem::Page));

    if current < total_pages - 3 {
        items.push(PageItem::Ellipsis);
    }

    items.push(PageItem::Page(total_pages - 1));
    items.push(PageItem::Page(total_pages));
    items
}

/// Pages needed for `total_items` at `page_size` per page. Never less than 1.
pub fn total_pages(total_items: u64, page_size: u32) -> u32 {
    let pages = total_items.div_ceil(u64::from(page_size.max(1))).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

pub fn can_go_prev(current: u32) -> bool {
    current > 1
}

pub fn can_go_next(current: u32, total_pages: u32) -> bool {
    current < total_pages
}

/// The page to move to, or `None` if `target` is out of range or already
/// showing.
pub fn navigate(current: u32, target: u32, total_pages: u32) -> Option<u32> {
    (target >= 1 && target <= total_pages && target != current).then_some(target)
}
