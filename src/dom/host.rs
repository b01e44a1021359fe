//! PageConverter - wires the conductor to the browser event loop
//!
//! One `MutationObserver` on `document.body` feeds mutation batches, and a
//! single re-armed `setTimeout` drives `tick` at the conductor's next
//! deadline. The clock is `Date.now()`.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};
use web_sys::{MutationObserver, MutationObserverInit, MutationRecord};

use crate::config::EngineConfig;
use crate::currency::RateTable;
use crate::dom::tree::{to_mutation, DomTree};
use crate::logging;
use crate::page::conductor::PriceConductor;
use crate::page::session::{PassStats, Settings};

fn now() -> u64 {
    js_sys::Date::now() as u64
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn stats_value(stats: &PassStats) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(stats).map_err(js_err)
}

struct Inner {
    conductor: PriceConductor<DomTree>,
    observer: Option<MutationObserver>,
    timer: Option<i32>,
    timer_fn: Option<js_sys::Function>,
}

impl Inner {
    /// Replace the pending timeout with one at the next deadline
    fn rearm(&mut self) {
        let Some(window) = web_sys::window() else { return };
        if let Some(handle) = self.timer.take() {
            window.clear_timeout_with_handle(handle);
        }
        let (Some(deadline), Some(callback)) = (self.conductor.next_deadline(), self.timer_fn.as_ref()) else {
            return;
        };
        let delay = deadline.saturating_sub(now()).min(i32::MAX as u64) as i32;
        match window.set_timeout_with_callback_and_timeout_and_arguments_0(callback, delay) {
            Ok(handle) => self.timer = Some(handle),
            Err(e) => tracing::warn!(error = ?e, "failed to arm timer"),
        }
    }

    fn tick(&mut self) {
        if let Err(e) = self.conductor.tick(now()) {
            tracing::debug!(error = %e, "tick skipped");
        }
        self.rearm();
    }
}

/// Live-page price converter
#[wasm_bindgen]
pub struct PageConverter {
    inner: Rc<RefCell<Inner>>,
    on_mutations: Option<Closure<dyn FnMut(js_sys::Array, MutationObserver)>>,
    on_timer: Option<Closure<dyn FnMut()>>,
}

#[wasm_bindgen]
impl PageConverter {
    /// `config` is an optional `EngineConfig` object (camelCase fields)
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<PageConverter, JsValue> {
        let mut config: EngineConfig = if config.is_undefined() || config.is_null() {
            EngineConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        config.normalize();
        config.validate().map_err(js_err)?;
        logging::init(&config.log_level);

        let tree = DomTree::from_window().map_err(js_err)?;
        let conductor = PriceConductor::new(tree, config, Settings::default());
        let inner = Rc::new(RefCell::new(Inner {
            conductor,
            observer: None,
            timer: None,
            timer_fn: None,
        }));

        let timer_inner = Rc::clone(&inner);
        let on_timer = Closure::<dyn FnMut()>::new(move || {
            if let Ok(mut inner) = timer_inner.try_borrow_mut() {
                inner.tick();
            }
        });
        inner.borrow_mut().timer_fn = Some(on_timer.as_ref().unchecked_ref::<js_sys::Function>().clone());

        let observed = Rc::clone(&inner);
        let on_mutations = Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::new(
            move |records: js_sys::Array, _observer: MutationObserver| {
                let Ok(mut inner) = observed.try_borrow_mut() else { return };
                let mutations: Vec<_> = records
                    .iter()
                    .filter_map(|r| r.dyn_into::<MutationRecord>().ok())
                    .filter_map(|r| to_mutation(&r))
                    .collect();
                inner.conductor.observe(&mutations, now());
                inner.rearm();
            },
        );

        Ok(PageConverter {
            inner,
            on_mutations: Some(on_mutations),
            on_timer: Some(on_timer),
        })
    }

    /// Apply settings, run the initial pass and begin observing
    #[wasm_bindgen]
    pub fn start(&mut self, settings: JsValue) -> Result<JsValue, JsValue> {
        let mut inner = self.inner.borrow_mut();
        if !settings.is_undefined() && !settings.is_null() {
            let settings: Settings = serde_wasm_bindgen::from_value(settings)?;
            inner.conductor.configure(settings);
        }
        let stats = inner.conductor.start(now()).map_err(js_err)?;

        if let Some(callback) = self.on_mutations.as_ref() {
            let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;
            let init = MutationObserverInit::new();
            init.set_child_list(true);
            init.set_subtree(true);
            init.set_character_data(true);
            let root = inner.conductor.tree().document().body().ok_or_else(|| js_err("no body"))?;
            observer.observe_with_options(&root, &init)?;
            inner.observer = Some(observer);
        }
        inner.rearm();
        stats_value(&stats)
    }

    /// Await a promise resolving to the stored settings and apply them
    #[wasm_bindgen(js_name = loadSettings)]
    pub fn load_settings(&self, pending: js_sys::Promise) -> js_sys::Promise {
        let inner = Rc::clone(&self.inner);
        let context = inner.borrow().conductor.context();
        future_to_promise(async move {
            let value = JsFuture::from(pending).await?;
            if !context.is_valid() {
                return Ok(JsValue::FALSE);
            }
            let settings: Settings = serde_wasm_bindgen::from_value(value)?;
            let mut inner = inner.borrow_mut();
            inner.conductor.apply_settings(settings, now());
            inner.rearm();
            Ok(JsValue::TRUE)
        })
    }

    #[wasm_bindgen(js_name = setTargetCurrency)]
    pub fn set_target_currency(&self, code: &str) -> usize {
        let mut inner = self.inner.borrow_mut();
        let restored = inner.conductor.set_target_currency(code, now());
        inner.rearm();
        restored
    }

    #[wasm_bindgen(js_name = setEnabled)]
    pub fn set_enabled(&self, enabled: bool) -> usize {
        let mut inner = self.inner.borrow_mut();
        let restored = inner.conductor.set_enabled(enabled, now());
        inner.rearm();
        restored
    }

    #[wasm_bindgen(js_name = forceRescan)]
    pub fn force_rescan(&self) -> Result<JsValue, JsValue> {
        let mut inner = self.inner.borrow_mut();
        let stats = inner.conductor.force_rescan(now()).map_err(js_err)?;
        stats_value(&stats)
    }

    /// `{base, rates, date?}` object from the rate collaborator
    #[wasm_bindgen(js_name = updateRates)]
    pub fn update_rates(&self, rates: JsValue) -> Result<usize, JsValue> {
        let mut table: RateTable = serde_wasm_bindgen::from_value(rates)?;
        table.rates.insert(table.base.clone(), 1.0);
        let mut inner = self.inner.borrow_mut();
        let restored = inner.conductor.update_rates(table, now());
        inner.rearm();
        Ok(restored)
    }

    /// Full settings object after a storage change notification
    #[wasm_bindgen(js_name = applySettings)]
    pub fn apply_settings(&self, settings: JsValue) -> Result<usize, JsValue> {
        let settings: Settings = serde_wasm_bindgen::from_value(settings)?;
        let mut inner = self.inner.borrow_mut();
        let restored = inner.conductor.apply_settings(settings, now());
        inner.rearm();
        Ok(restored)
    }

    #[wasm_bindgen(getter, js_name = pageCurrency)]
    pub fn page_currency(&self) -> Option<String> {
        self.inner.borrow().conductor.page_currency().map(str::to_string)
    }

    #[wasm_bindgen]
    pub fn totals(&self) -> Result<JsValue, JsValue> {
        stats_value(&self.inner.borrow().conductor.totals())
    }

    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        self.inner.borrow().conductor.state_name().to_string()
    }

    /// Disconnect the observer, cancel the timer and drop the callbacks
    #[wasm_bindgen]
    pub fn teardown(&mut self) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.conductor.teardown();
            if let Some(observer) = inner.observer.take() {
                observer.disconnect();
            }
            if let (Some(window), Some(handle)) = (web_sys::window(), inner.timer.take()) {
                window.clear_timeout_with_handle(handle);
            }
            inner.timer_fn = None;
        }
        self.on_mutations = None;
        self.on_timer = None;
    }
}
