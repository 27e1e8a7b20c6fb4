#![allow(dead_code)]

use core_events::RxObserver;
use core_text::AnnotatedText;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Recorded {
    raw: Vec<String>,
    outputs: Vec<Arc<AnnotatedText>>,
}

/// Observer that keeps every notification for later inspection.
#[derive(Clone, Default)]
pub struct Recorder {
    inner: Arc<Mutex<Recorded>>,
}

impl RxObserver for Recorder {
    fn on_raw_data(&mut self, text: &str) {
        self.inner.lock().unwrap().raw.push(text.to_string());
    }

    fn on_output(&mut self, snapshot: Arc<AnnotatedText>) {
        self.inner.lock().unwrap().outputs.push(snapshot);
    }
}

impl Recorder {
    pub fn outputs(&self) -> Vec<Arc<AnnotatedText>> {
        self.inner.lock().unwrap().outputs.clone()
    }

    pub fn output_texts(&self) -> Vec<String> {
        self.outputs().iter().map(|o| o.text()).collect()
    }

    pub fn output_text(&self) -> String {
        self.output_texts().concat()
    }

    pub fn raw(&self) -> Vec<String> {
        self.inner.lock().unwrap().raw.clone()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.raw.clear();
        inner.outputs.clear();
    }
}
