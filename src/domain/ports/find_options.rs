/// Ordering hint honoured by repository listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderHint {
    #[default]
    Newest,
    Oldest,
    Name,
}

/// Options shared by every repository `find_*` listing.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub include_deleted: bool,
    pub order: OrderHint,
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn including_deleted(include_deleted: bool) -> Self {
        Self {
            include_deleted,
            ..Default::default()
        }
    }
}
