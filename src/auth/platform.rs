use oso::PolarClass;
use serde::{Deserialize, Serialize};

/// The marketplace as a whole; platform-wide permissions are checked on it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Platform {
    id: String,
}

impl PolarClass for Platform {
    fn get_polar_class_builder() -> oso::ClassBuilder<Platform> {
        oso::Class::builder()
            .name("Platform")
            .add_attribute_getter("id", |recv: &Platform| recv.id.clone())
    }

    fn get_polar_class() -> oso::Class {
        let builder = Platform::get_polar_class_builder();
        builder.build()
    }
}
