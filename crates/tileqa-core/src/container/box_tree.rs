use tileqa_geom::Envelope;

/// Entries per node before it splits into quadrants.
const MAX_NODE_ENTRIES: usize = 64;

///
/// BoxTree
///
/// Quadtree over envelopes for the tile cache's spatial searches. An
/// entry that straddles a quadrant boundary stays at the node that
/// spans it.
///

pub struct BoxTree<T> {
    root: Node<T>,
    len: usize,
}

struct Node<T> {
    extent: Envelope,
    entries: Vec<(Envelope, T)>,
    children: Option<Box<[Node<T>; 4]>>,
}

impl<T> BoxTree<T> {
    #[must_use]
    pub const fn new(extent: Envelope) -> Self {
        Self {
            root: Node {
                extent,
                entries: Vec::new(),
                children: None,
            },
            len: 0,
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, envelope: Envelope, item: T) {
        self.root.insert(envelope, item);
        self.len += 1;
    }

    /// All items whose envelope intersects `query`.
    pub fn search(&self, query: &Envelope) -> Vec<&T> {
        let mut hits = Vec::new();
        self.root.search(query, &mut hits);
        hits
    }
}

impl<T> Node<T> {
    fn insert(&mut self, envelope: Envelope, item: T) {
        if self.children.is_none() {
            self.entries.push((envelope, item));
            if self.entries.len() > MAX_NODE_ENTRIES && self.can_split() {
                self.split();
            }
            return;
        }

        match self.quadrant_for(&envelope) {
            Some(index) => {
                if let Some(children) = &mut self.children {
                    children[index].insert(envelope, item);
                }
            }
            None => self.entries.push((envelope, item)),
        }
    }

    fn can_split(&self) -> bool {
        self.extent.width() > 0.0 && self.extent.height() > 0.0
    }

    fn split(&mut self) {
        let quadrants = self.quadrants();
        self.children = Some(Box::new(quadrants.map(|extent| Node {
            extent,
            entries: Vec::new(),
            children: None,
        })));

        let entries = std::mem::take(&mut self.entries);
        for (envelope, item) in entries {
            match self.quadrant_for(&envelope) {
                Some(index) => {
                    if let Some(children) = &mut self.children {
                        children[index].insert(envelope, item);
                    }
                }
                None => self.entries.push((envelope, item)),
            }
        }
    }

    fn quadrants(&self) -> [Envelope; 4] {
        let cx = f64::midpoint(self.extent.x_min, self.extent.x_max);
        let cy = f64::midpoint(self.extent.y_min, self.extent.y_max);

        [
            Envelope::new(self.extent.x_min, self.extent.y_min, cx, cy),
            Envelope::new(cx, self.extent.y_min, self.extent.x_max, cy),
            Envelope::new(self.extent.x_min, cy, cx, self.extent.y_max),
            Envelope::new(cx, cy, self.extent.x_max, self.extent.y_max),
        ]
    }

    /// The single quadrant fully containing `envelope`, if any.
    fn quadrant_for(&self, envelope: &Envelope) -> Option<usize> {
        self.quadrants()
            .iter()
            .position(|q| q.contains(envelope))
    }

    fn search<'a>(&'a self, query: &Envelope, hits: &mut Vec<&'a T>) {
        if !self.extent.intersects(query) {
            return;
        }

        for (envelope, item) in &self.entries {
            if envelope.intersects(query) {
                hits.push(item);
            }
        }

        if let Some(children) = &self.children {
            for child in children.iter() {
                child.search(query, hits);
            }
        }
    }
}
