mod dispatch;
mod mocks;
mod orders;
mod products;
mod uninstall;
