mod device;
mod message;
mod system;
mod user;

pub use device::{Device, Grainbin, TemperatureCable, TemperatureSensor};
pub use message::Message;
pub use system::{Hardware, Interface, Software, SystemSetup, Wifi};
pub use user::{Role, User};
