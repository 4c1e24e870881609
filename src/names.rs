/// Interface names in discovery order, without duplicates.
#[derive(Debug, Default)]
pub(crate) struct InterfaceNames(Vec<String>);

impl InterfaceNames {
    pub(crate) fn push(&mut self, name: &str) {
        // Entries of one interface usually come in a row
        if self.0.last().map(String::as_str) == Some(name) {
            return;
        }
        if !self.0.iter().any(|n| n == name) {
            self.0.push(name.to_owned());
        }
    }

    pub(crate) fn into_vec(self) -> Vec<String> {
        self.0
    }
}
