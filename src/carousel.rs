//! Paging over the sentence cards of a paragraph result.
//!
//! [`Carousel`] owns the current index; [`view`] turns an index and card count
//! into the flags the presentation surface applies. Inputs that do not name a
//! valid page leave the state alone.

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerZone {
    Left,
    Right,
}

impl PointerZone {
    /// Splits the card area at its midpoint. Returns `None` for degenerate
    /// geometry.
    pub fn from_position(x: f64, width: f64) -> Option<Self> {
        if !x.is_finite() || !width.is_finite() || width <= 0.0 {
            return None;
        }
        if x < width / 2.0 {
            Some(PointerZone::Left)
        } else {
            Some(PointerZone::Right)
        }
    }
}

/// Visibility of each card and active state of each indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CarouselView {
    pub cards: Vec<bool>,
    /// Empty when there is a single card.
    pub indicators: Vec<bool>,
}

impl CarouselView {
    pub fn visible_index(&self) -> Option<usize> {
        self.cards.iter().position(|visible| *visible)
    }

    pub fn visible_count(&self) -> usize {
        self.cards.iter().filter(|v| **v).count()
    }

    pub fn active_indicator_count(&self) -> usize {
        self.indicators.iter().filter(|v| **v).count()
    }
}

/// Flags for page `index` out of `len`.
pub fn view(index: usize, len: usize) -> CarouselView {
    let cards = (0..len).map(|i| i == index).collect();
    let indicators = if len > 1 {
        (0..len).map(|i| i == index).collect()
    } else {
        Vec::new()
    };
    CarouselView { cards, indicators }
}

/// One interaction with a carousel, as the page reports it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CarouselInput {
    Advance,
    Retreat,
    /// Raw `data-index` of the activated indicator.
    Indicator { index: String },
    /// Click position relative to the card area.
    Pointer { x: f64, width: f64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Carousel {
    len: usize,
    index: usize,
}

impl Carousel {
    /// A carousel needs at least one card.
    pub fn new(len: usize) -> Option<Self> {
        (len > 0).then_some(Self { len, index: 0 })
    }

    /// Resumes a carousel at page `index`, e.g. from state kept by the page.
    pub fn at(len: usize, index: usize) -> Option<Self> {
        (index < len).then_some(Self { len, index })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn has_indicators(&self) -> bool {
        self.len > 1
    }

    pub fn view(&self) -> CarouselView {
        view(self.index, self.len)
    }

    pub fn advance(&mut self) -> CarouselView {
        self.index = (self.index + 1) % self.len;
        debug!(index = self.index, len = self.len, "Carousel advanced");
        self.view()
    }

    pub fn retreat(&mut self) -> CarouselView {
        self.index = (self.index + self.len - 1) % self.len;
        debug!(index = self.index, len = self.len, "Carousel retreated");
        self.view()
    }

    pub fn jump_to(&mut self, index: usize) -> Option<CarouselView> {
        if index >= self.len {
            return None;
        }
        self.index = index;
        debug!(index = self.index, len = self.len, "Carousel jumped");
        Some(self.view())
    }

    /// Indicator activation as it arrives from markup, e.g. a `data-index`
    /// attribute value.
    pub fn jump_to_indicator(&mut self, raw: &str) -> Option<CarouselView> {
        let index = raw.trim().parse::<usize>().ok()?;
        self.jump_to(index)
    }

    pub fn pointer(&mut self, x: f64, width: f64) -> Option<CarouselView> {
        match PointerZone::from_position(x, width)? {
            PointerZone::Left => Some(self.retreat()),
            PointerZone::Right => Some(self.advance()),
        }
    }

    /// Returns `None` when the input names no valid page.
    pub fn apply(&mut self, input: &CarouselInput) -> Option<CarouselView> {
        match input {
            CarouselInput::Advance => Some(self.advance()),
            CarouselInput::Retreat => Some(self.retreat()),
            CarouselInput::Indicator { index } => self.jump_to_indicator(index),
            CarouselInput::Pointer { x, width } => self.pointer(*x, *width),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn assert_invariants(carousel: &Carousel) {
        let view = carousel.view();
        assert!(carousel.index() < carousel.len());
        assert_eq!(view.cards.len(), carousel.len());
        assert_eq!(view.visible_count(), 1);
        assert_eq!(view.visible_index(), Some(carousel.index()));
        if carousel.len() > 1 {
            assert_eq!(view.indicators.len(), carousel.len());
            assert_eq!(view.active_indicator_count(), 1);
            assert!(view.indicators[carousel.index()]);
        } else {
            assert!(view.indicators.is_empty());
        }
    }

    #[test]
    fn empty_carousel_is_not_created() {
        assert!(Carousel::new(0).is_none());
    }

    #[test]
    fn initial_state_shows_first_card() {
        let carousel = Carousel::new(3).unwrap();
        assert_eq!(
            carousel.view(),
            CarouselView {
                cards: vec![true, false, false],
                indicators: vec![true, false, false],
            }
        );
    }

    #[test]
    fn single_card_has_no_indicators_and_stays_put() {
        let mut carousel = Carousel::new(1).unwrap();
        assert!(!carousel.has_indicators());
        carousel.advance();
        carousel.retreat();
        assert_eq!(carousel.index(), 0);
        assert_invariants(&carousel);
    }

    #[test]
    fn three_right_clicks_wrap_back_to_start() {
        let mut carousel = Carousel::new(3).unwrap();
        for expected in [1, 2, 0] {
            let view = carousel.pointer(300.0, 400.0).unwrap();
            assert_eq!(view.visible_index(), Some(expected));
        }
    }

    #[test]
    fn left_half_retreats_with_wraparound() {
        let mut carousel = Carousel::new(4).unwrap();
        let view = carousel.pointer(10.0, 400.0).unwrap();
        assert_eq!(view.visible_index(), Some(3));
        carousel.pointer(199.9, 400.0);
        assert_eq!(carousel.index(), 2);
        // the midpoint belongs to the right half
        carousel.pointer(200.0, 400.0);
        assert_eq!(carousel.index(), 3);
    }

    #[test]
    fn invalid_inputs_are_ignored() {
        let mut carousel = Carousel::new(3).unwrap();
        carousel.jump_to(1);
        assert_eq!(carousel.jump_to(3), None);
        assert_eq!(carousel.jump_to_indicator("abc"), None);
        assert_eq!(carousel.jump_to_indicator("-1"), None);
        assert_eq!(carousel.jump_to_indicator(""), None);
        assert_eq!(carousel.pointer(10.0, 0.0), None);
        assert_eq!(carousel.pointer(f64::NAN, 100.0), None);
        assert_eq!(carousel.index(), 1);
        assert_eq!(
            carousel.jump_to_indicator(" 2 ").map(|v| v.visible_index()),
            Some(Some(2))
        );
    }

    #[test]
    fn invariants_hold_over_transition_sequences() {
        let mut rng = SmallRng::seed_from_u64(0x9e37_79b9);
        for len in 1..=7 {
            let mut carousel = Carousel::new(len).unwrap();
            assert_invariants(&carousel);
            for _ in 0..200 {
                match rng.gen_range(0..5) {
                    0 => {
                        carousel.advance();
                    }
                    1 => {
                        carousel.retreat();
                    }
                    2 => {
                        carousel.jump_to(rng.gen_range(0..len + 2));
                    }
                    3 => {
                        carousel.pointer(rng.gen_range(-50.0..450.0), 400.0);
                    }
                    _ => {
                        carousel.jump_to_indicator(&rng.gen_range(0..10).to_string());
                    }
                }
                assert_invariants(&carousel);
            }
        }
    }

    #[test]
    fn resumed_carousel_applies_page_inputs() {
        assert!(Carousel::at(3, 3).is_none());
        let mut carousel = Carousel::at(3, 2).unwrap();
        let input: CarouselInput = serde_json::from_str(r#"{"action":"advance"}"#).unwrap();
        assert_eq!(carousel.apply(&input).and_then(|v| v.visible_index()), Some(0));
        let input: CarouselInput =
            serde_json::from_str(r#"{"action":"indicator","index":"1"}"#).unwrap();
        assert_eq!(carousel.apply(&input).and_then(|v| v.visible_index()), Some(1));
        let input = CarouselInput::Pointer { x: 5.0, width: 100.0 };
        assert_eq!(carousel.apply(&input).and_then(|v| v.visible_index()), Some(0));
        let input = CarouselInput::Indicator { index: "7".into() };
        assert_eq!(carousel.apply(&input), None);
        assert_eq!(carousel.index(), 0);
    }

    #[test]
    fn independent_instances_do_not_interfere() {
        let mut first = Carousel::new(3).unwrap();
        let second = Carousel::new(3).unwrap();
        first.advance();
        assert_eq!(first.index(), 1);
        assert_eq!(second.index(), 0);
    }
}
