use std::cell::Cell;
use std::rc::Rc;

use crate::censor::config::CensorConfig;
use crate::censor::pipeline::CensorPipeline;
use crate::dom::{ArenaDom, NodeId};
use crate::store::MemoryStore;

pub const URL: &str = "https://jobs.example/listing";

pub type Page = CensorPipeline<ArenaDom, MemoryStore>;

/// A page with one `<p>` per entry, plus a handle onto its store
pub fn page(paragraphs: &[&str]) -> (Page, MemoryStore) {
    page_with_store(paragraphs, MemoryStore::new())
}

pub fn page_with_store(paragraphs: &[&str], store: MemoryStore) -> (Page, MemoryStore) {
    let mut dom = ArenaDom::new().with_location(URL);
    let body = dom.body_id();
    for text in paragraphs {
        let p = dom.append_element(body, "p");
        dom.append_text(p, text);
    }
    let pipeline = CensorPipeline::new(dom, store.clone(), CensorConfig::default()).unwrap();
    (pipeline, store)
}

/// Count writes to `key` from now on
pub fn count_writes(store: &MemoryStore, key: &str) -> Rc<Cell<u32>> {
    let count = Rc::new(Cell::new(0));
    let seen = Rc::clone(&count);
    store.watch(key, move |_| seen.set(seen.get() + 1));
    count
}

pub fn body_text(pipeline: &Page) -> String {
    let dom = pipeline.dom();
    dom.text_content(dom.body_id())
}

pub fn body(pipeline: &Page) -> NodeId {
    pipeline.dom().body_id()
}
