//! Bindings to the Google API JavaScript client (`gapi`).
//!
//! Every gapi entry point reports through a callback. Each call is wrapped in
//! a `Promise` whose `resolve` is handed to gapi as that callback, so the
//! result can be awaited.

use js_sys::{Array, Function, Promise, Reflect};
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::endpoints::Backend;
use crate::error::ViewerError;
use crate::model::AccessToken;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["gapi", "client"], js_name = load)]
    fn client_load(
        name: &str,
        version: &str,
        callback: &Function,
        root: &JsValue,
    ) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["gapi", "auth"], js_name = authorize)]
    fn auth_authorize(params: &JsValue, callback: &Function) -> Result<(), JsValue>;
}

#[derive(Serialize)]
struct AuthorizeParams<'a> {
    client_id: &'a str,
    scope: &'a [&'a str],
    immediate: bool,
}

fn js_error(context: &str, err: JsValue) -> String {
    let detail = err
        .as_string()
        .or_else(|| {
            Reflect::get(&err, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| "Unknown error".to_string());
    format!("{}: {}", context, detail)
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, ViewerError> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| ViewerError::Transport(e.to_string()))
}

/// Start a callback-style call. When `register` itself fails the callback will
/// never fire, so the failure goes to `reject` instead. Returns whether the
/// call was started.
fn register_or_reject<E>(register: impl FnOnce() -> Result<(), E>, reject: impl FnOnce(E)) -> bool {
    match register() {
        Ok(()) => true,
        Err(e) => {
            reject(e);
            false
        }
    }
}

/// Await a gapi call that reports through a single callback argument.
async fn callback_result(
    register: impl FnOnce(&Function) -> Result<(), JsValue>,
) -> Result<JsValue, JsValue> {
    let mut register = Some(register);
    let promise = Promise::new(&mut |resolve, reject| {
        if let Some(register) = register.take() {
            register_or_reject(
                || register(&resolve),
                |e| {
                    let _ = reject.call1(&JsValue::UNDEFINED, &e);
                },
            );
        }
    });
    JsFuture::from(promise).await
}

/// Walk a dotted path below `gapi.client`, returning the final value and its parent.
fn resolve_path(method: &str) -> Result<(JsValue, JsValue), ViewerError> {
    let global = js_sys::global();
    let mut parent = Reflect::get(&global, &JsValue::from_str("gapi"))
        .and_then(|gapi| Reflect::get(&gapi, &JsValue::from_str("client")))
        .map_err(|e| ViewerError::ApiLoad(js_error("gapi.client unavailable", e)))?;
    let mut current = parent.clone();

    for segment in method.split('.') {
        if current.is_undefined() || current.is_null() {
            return Err(ViewerError::ApiLoad(format!("{} is not loaded", method)));
        }
        parent = current;
        current = Reflect::get(&parent, &JsValue::from_str(segment))
            .map_err(|e| ViewerError::ApiLoad(js_error(method, e)))?;
    }
    Ok((current, parent))
}

/// `Backend` implementation over the page's global `gapi` object.
#[derive(Default)]
pub struct GapiBackend;

impl Backend for GapiBackend {
    async fn load_api(
        &self,
        name: &str,
        version: &str,
        root: Option<&str>,
    ) -> Result<(), ViewerError> {
        let root = root.map(JsValue::from_str).unwrap_or(JsValue::UNDEFINED);
        callback_result(|done| client_load(name, version, done, &root))
            .await
            .map(|_| ())
            .map_err(|e| ViewerError::ApiLoad(js_error(name, e)))
    }

    async fn authorize(
        &self,
        client_id: &str,
        scopes: &[&str],
        immediate: bool,
    ) -> Result<AccessToken, ViewerError> {
        let params = to_js(&AuthorizeParams {
            client_id,
            scope: scopes,
            immediate,
        })?;
        let token = callback_result(|done| auth_authorize(&params, done))
            .await
            .map_err(|e| ViewerError::SignIn(js_error("authorize", e)))?;

        if token.is_null() || token.is_undefined() {
            return Err(ViewerError::SignIn("No token returned".to_string()));
        }
        serde_wasm_bindgen::from_value(token).map_err(|e| ViewerError::Decode(e.to_string()))
    }

    async fn execute(&self, method: &str, payload: Value) -> Result<Value, ViewerError> {
        let (function, parent) = resolve_path(method)?;
        let function: Function = function
            .dyn_into()
            .map_err(|_| ViewerError::ApiLoad(format!("{} is not callable", method)))?;

        let args = Array::of1(&to_js(&payload)?);
        let request = function
            .apply(&parent, &args)
            .map_err(|e| ViewerError::Transport(js_error(method, e)))?;
        let execute: Function = Reflect::get(&request, &JsValue::from_str("execute"))
            .map_err(|e| ViewerError::Transport(js_error(method, e)))?
            .dyn_into()
            .map_err(|_| ViewerError::Transport(format!("{} request has no execute()", method)))?;

        let response = callback_result(|done| execute.call1(&request, done).map(|_| ()))
        .await
        .map_err(|e| ViewerError::Transport(js_error(method, e)))?;

        if response.is_null() || response.is_undefined() {
            return Err(ViewerError::Transport(format!("{} returned nothing", method)));
        }
        serde_wasm_bindgen::from_value(response).map_err(|e| ViewerError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[test]
    fn test_failed_registration_is_rejected() {
        let rejected = RefCell::new(None);

        let started = register_or_reject(
            || Err("execute threw"),
            |e| *rejected.borrow_mut() = Some(e),
        );

        assert!(!started);
        assert_eq!(*rejected.borrow(), Some("execute threw"));
    }

    #[test]
    fn test_started_call_is_left_to_its_callback() {
        let rejected = RefCell::new(false);

        let started = register_or_reject(|| Ok::<(), &str>(()), |_| *rejected.borrow_mut() = true);

        assert!(started);
        assert!(!*rejected.borrow());
    }
}
