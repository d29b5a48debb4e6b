//! Commands acting on settings and profiles.

use crate::core::{AppState, ProfileData, ProfileUpdate, SettingsData, ThemeKind};
use crate::utils::OptimizerResult;

pub fn get_settings(state: &AppState) -> SettingsData {
    state.profiles().settings()
}

pub fn active_profile(state: &AppState) -> ProfileData {
    state.profiles().active_profile()
}

pub fn update_profile(state: &AppState, id: u32, update: &ProfileUpdate) {
    state.profiles().update_profile(id, update);
}

pub fn set_active_profile(state: &AppState, id: u32) {
    state.profiles().set_active_profile(id);
}

pub fn set_threads(state: &AppState, threads: u32) {
    state.profiles().set_threads(threads);
}

pub async fn set_theme(state: &AppState, theme: ThemeKind) -> OptimizerResult<()> {
    state.profiles().set_theme(theme).await
}

pub async fn create_profile(state: &AppState, name: &str) -> OptimizerResult<()> {
    state.profiles().create_profile(name).await
}

pub async fn delete_profile(state: &AppState, id: u32) -> OptimizerResult<()> {
    state.profiles().delete_profile(id).await
}

pub async fn reset_profile(state: &AppState, id: u32) -> OptimizerResult<()> {
    state.profiles().reset_profile(id).await
}

pub async fn reset_settings(state: &AppState) -> OptimizerResult<()> {
    state.profiles().reset_settings().await
}

pub async fn open_settings_window(state: &AppState) -> OptimizerResult<()> {
    state.service().open_settings_window().await
}
