use std::fmt::{self, Display, Formatter};

use image::DynamicImage;

use crate::{dverr, result::DvResult, types::NavState};

/// Which of the navigation controls can be used.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NavButtons {
    pub previous_enabled: bool,
    pub next_enabled: bool,
}
impl NavButtons {
    pub fn from_state(state: NavState) -> Self {
        match state.current_idx {
            Some(idx) => Self {
                previous_enabled: idx > 0,
                next_enabled: idx + 1 < state.len,
            },
            None => Self::default(),
        }
    }
}
impl Display for NavButtons {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let on_off = |enabled: bool| if enabled { "on" } else { "off" };
        write!(
            f,
            "previous: {}, next: {}",
            on_off(self.previous_enabled),
            on_off(self.next_enabled)
        )
    }
}

/// Parses the number of images to fetch. Only counts in `1..=max_count` are accepted.
pub fn parse_count(text: &str, max_count: usize) -> DvResult<usize> {
    let invalid = || dverr!(Other, "The number should be in range of 1 to {max_count}");
    let count = text.trim().parse::<usize>().map_err(|_| invalid())?;
    if (1..=max_count).contains(&count) {
        Ok(count)
    } else {
        Err(invalid())
    }
}

/// One line describing the displayed image, e.g., `[2/3] https://... 500x375`.
pub fn describe(state: NavState, url: &str, im: &DynamicImage) -> String {
    let pos = state.current_idx.map(|idx| idx + 1).unwrap_or(0);
    format!(
        "[{pos}/{}] {url} {}x{}",
        state.len,
        im.width(),
        im.height()
    )
}

#[test]
fn test_buttons() {
    let buttons = |current_idx, len| NavButtons::from_state(NavState { current_idx, len });
    assert_eq!(buttons(None, 0), NavButtons::default());
    let single = buttons(Some(0), 1);
    assert!(!single.previous_enabled && !single.next_enabled);
    let first = buttons(Some(0), 3);
    assert!(!first.previous_enabled && first.next_enabled);
    let middle = buttons(Some(1), 3);
    assert!(middle.previous_enabled && middle.next_enabled);
    let last = buttons(Some(2), 3);
    assert!(last.previous_enabled && !last.next_enabled);
    assert_eq!(format!("{last}"), "previous: on, next: off");
}

#[test]
fn test_parse_count() {
    assert_eq!(parse_count("1", 10).unwrap(), 1);
    assert_eq!(parse_count(" 10\n", 10).unwrap(), 10);
    assert!(parse_count("0", 10).is_err());
    assert!(parse_count("11", 10).is_err());
    assert!(parse_count("-3", 10).is_err());
    assert!(parse_count("three", 10).is_err());
    assert!(parse_count("", 10).is_err());
    assert_eq!(
        parse_count("11", 10).unwrap_err().msg(),
        "The number should be in range of 1 to 10"
    );
}

#[test]
fn test_describe() {
    let im = crate::test_helpers::dummy_image(4, 2);
    let state = NavState {
        current_idx: Some(1),
        len: 3,
    };
    assert_eq!(describe(state, "https://x.org/b.jpg", &im), "[2/3] https://x.org/b.jpg 4x2");
}
