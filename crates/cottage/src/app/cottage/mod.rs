mod scene_impl;
mod ui_bridge;

pub(crate) use scene_impl::CottageScene;
