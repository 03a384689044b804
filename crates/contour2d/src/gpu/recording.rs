//! In-memory backend for headless hosts and tests.

use std::collections::HashMap;

use super::{BufferId, BufferRole, DrawCommand, GpuBackend, ProgramId, ProgramSource};
use crate::error::{ContourError, Result};

/// Every call a [`RecordingBackend`] has seen, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CompileProgram(&'static str),
    ReleaseProgram(ProgramId),
    CreateBuffer(BufferId, BufferRole),
    UpdateBuffer(BufferId, usize),
    ReleaseBuffer(BufferId),
    Draw(DrawCommand),
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<BackendCall>,
    programs: Vec<Option<&'static str>>,
    buffers: HashMap<BufferId, (BufferRole, Vec<u8>)>,
    next_buffer: u32,
    reject_shaders: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose shader compiler rejects everything.
    pub fn failing_compilation() -> Self {
        Self {
            reject_shaders: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn draws(&self) -> Vec<&DrawCommand> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::Draw(cmd) => Some(cmd),
                _ => None,
            })
            .collect()
    }

    pub fn buffer_contents(&self, id: BufferId) -> Option<&[u8]> {
        self.buffers.get(&id).map(|(_, data)| data.as_slice())
    }

    pub fn buffer_role(&self, id: BufferId) -> Option<BufferRole> {
        self.buffers.get(&id).map(|(role, _)| *role)
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn program_label(&self, id: ProgramId) -> Option<&'static str> {
        self.programs.get(id.0 as usize).copied().flatten()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.iter().filter(|p| p.is_some()).count()
    }
}

impl GpuBackend for RecordingBackend {
    fn compile_program(&mut self, source: &ProgramSource) -> Result<ProgramId> {
        self.calls.push(BackendCall::CompileProgram(source.label));
        if self.reject_shaders {
            return Err(ContourError::Shader {
                label: source.label.to_string(),
                message: "compilation rejected".to_string(),
            });
        }
        let id = ProgramId(self.programs.len() as u32);
        self.programs.push(Some(source.label));
        Ok(id)
    }

    fn release_program(&mut self, program: ProgramId) {
        if let Some(slot) = self.programs.get_mut(program.0 as usize) {
            *slot = None;
        }
        self.calls.push(BackendCall::ReleaseProgram(program));
    }

    fn create_buffer(&mut self, role: BufferRole) -> Result<BufferId> {
        let id = BufferId(self.next_buffer);
        self.next_buffer += 1;
        self.buffers.insert(id, (role, Vec::new()));
        self.calls.push(BackendCall::CreateBuffer(id, role));
        Ok(id)
    }

    fn update_buffer(&mut self, buffer: BufferId, data: &[u8]) -> Result<()> {
        let (_, stored) = self
            .buffers
            .get_mut(&buffer)
            .ok_or(ContourError::UnknownHandle(buffer.0))?;
        stored.clear();
        stored.extend_from_slice(data);
        self.calls.push(BackendCall::UpdateBuffer(buffer, data.len()));
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
        self.calls.push(BackendCall::ReleaseBuffer(buffer));
    }

    fn draw(&mut self, command: &DrawCommand) -> Result<()> {
        if self.program_label(command.program).is_none() {
            return Err(ContourError::UnknownHandle(command.program.0));
        }
        for binding in [command.position_tangent, command.color] {
            if !self.buffers.contains_key(&binding.buffer) {
                return Err(ContourError::UnknownHandle(binding.buffer.0));
            }
        }
        self.calls.push(BackendCall::Draw(*command));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::shaders::CONTOUR_PROGRAM;

    #[test]
    fn buffers_hold_the_latest_upload() {
        let mut backend = RecordingBackend::new();
        let id = backend.create_buffer(BufferRole::Color).unwrap();
        backend.update_buffer(id, &[1, 2, 3, 4]).unwrap();
        backend.update_buffer(id, &[9]).unwrap();
        assert_eq!(backend.buffer_contents(id), Some(&[9u8][..]));
        assert_eq!(backend.buffer_role(id), Some(BufferRole::Color));
        backend.release_buffer(id);
        assert!(backend.buffer_contents(id).is_none());
        assert!(matches!(
            backend.update_buffer(id, &[0]),
            Err(ContourError::UnknownHandle(_))
        ));
    }

    #[test]
    fn released_programs_cannot_draw() {
        let mut backend = RecordingBackend::new();
        let program = backend.compile_program(&CONTOUR_PROGRAM).unwrap();
        assert_eq!(backend.live_programs(), 1);
        backend.release_program(program);
        assert_eq!(backend.live_programs(), 0);
        assert!(backend.program_label(program).is_none());
    }

    #[test]
    fn failing_compilation_reports_the_program_label() {
        let mut backend = RecordingBackend::failing_compilation();
        match backend.compile_program(&CONTOUR_PROGRAM) {
            Err(ContourError::Shader { label, .. }) => assert_eq!(label, CONTOUR_PROGRAM.label),
            other => panic!("unexpected {other:?}"),
        }
    }
}
