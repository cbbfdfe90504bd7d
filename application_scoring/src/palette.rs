use std::collections::HashMap;

/// The colors used for organizations in tables and charts.
pub const DEFAULT_COLORS: [&str; 7] = [
    "#1B2C41", "#F9B122", "#56B4E9", "#009E73", "#0072B2", "#D55E00", "#CC79A7",
];

/// Assigns a fixed color to every organization, in the order in which
/// organizations are first seen. Colors are reused once the palette is
/// exhausted.
///
/// ```
/// use application_scoring::OrganizationPalette;
///
/// let mut palette = OrganizationPalette::default();
/// let first = palette.color("Org A").to_string();
/// assert_eq!(palette.color("Org B"), "#F9B122");
/// assert_eq!(palette.color("Org A"), first);
/// ```
#[derive(Debug, Clone)]
pub struct OrganizationPalette {
    colors: Vec<String>,
    assigned: HashMap<String, usize>,
}

impl OrganizationPalette {
    /// An empty list of colors falls back to the default palette.
    pub fn new(colors: &[&str]) -> OrganizationPalette {
        let colors: Vec<String> = if colors.is_empty() {
            DEFAULT_COLORS.iter().map(|c| c.to_string()).collect()
        } else {
            colors.iter().map(|c| c.to_string()).collect()
        };
        OrganizationPalette {
            colors,
            assigned: HashMap::new(),
        }
    }

    pub fn color(&mut self, organization: &str) -> &str {
        let next = self.assigned.len();
        let idx = *self
            .assigned
            .entry(organization.to_string())
            .or_insert(next % self.colors.len());
        &self.colors[idx]
    }

    /// Forgets all the assignments.
    pub fn reset(&mut self) {
        self.assigned.clear();
    }
}

impl Default for OrganizationPalette {
    fn default() -> Self {
        OrganizationPalette::new(&DEFAULT_COLORS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_wrap_around() {
        let mut palette = OrganizationPalette::new(&["#000000", "#FFFFFF"]);
        assert_eq!(palette.color("a"), "#000000");
        assert_eq!(palette.color("b"), "#FFFFFF");
        assert_eq!(palette.color("c"), "#000000");
        assert_eq!(palette.color("b"), "#FFFFFF");
    }

    #[test]
    fn reset_starts_over() {
        let mut palette = OrganizationPalette::default();
        palette.color("a");
        assert_eq!(palette.color("b"), DEFAULT_COLORS[1]);
        palette.reset();
        assert_eq!(palette.color("b"), DEFAULT_COLORS[0]);
    }
}
