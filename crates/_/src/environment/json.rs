use crate::environment::{ModuleDefiner, ModuleEnvironment};
use serde_json::Value;
use std::{cell::RefCell, error::Error, rc::Rc};

/// Environment treating script content as a JSON object that maps module ids
/// to their exports. Attached style sheets are recorded in order.
///
/// Clones share the attached style sheets, so a clone kept outside the loader
/// can inspect what the loader attached.
#[derive(Debug, Default, Clone)]
pub struct JsonModuleEnvironment {
    styles: Rc<RefCell<Vec<(String, String)>>>,
}

impl JsonModuleEnvironment {
    /// Locations of attached style sheets.
    pub fn attached_styles(&self) -> Vec<String> {
        self.styles
            .borrow()
            .iter()
            .map(|(location, _)| location.clone())
            .collect()
    }

    pub fn style_content(&self, location: &str) -> Option<String> {
        self.styles
            .borrow()
            .iter()
            .find(|(item, _)| item == location)
            .map(|(_, content)| content.clone())
    }
}

impl ModuleEnvironment for JsonModuleEnvironment {
    fn execute_script(
        &mut self,
        location: &str,
        content: &str,
        definer: &mut ModuleDefiner,
    ) -> Result<(), Box<dyn Error>> {
        let Value::Object(modules) = serde_json::from_str::<Value>(content)
            .map_err(|error| format!("Failed to parse `{location}` script: {error}"))?
        else {
            return Err(format!("Script `{location}` is not a JSON object of modules").into());
        };
        for (id, exports) in modules {
            definer.define(id, exports);
        }
        Ok(())
    }

    fn attach_style(&mut self, location: &str, content: &str) -> Result<(), Box<dyn Error>> {
        self.styles
            .borrow_mut()
            .push((location.to_owned(), content.to_owned()));
        Ok(())
    }
}
