//! 绘图会话
//!
//! 会话是显式持有的聚合根：管段、元件、待定点、选择、撤销历史和底图都在
//! 这里。所有修改都由离散输入事件同步触发，可以用 `&mut self` 方法直接
//! 调用，也可以作为 `(state, event) -> state'` 的归约函数使用
//! （[`DrawingSession::apply`]），不依赖任何窗口或渲染框架。

use crate::assembler::complete_pending_path;
use crate::blueprint::Blueprint;
use crate::component::{find_nearby_port, ComponentInstance, ComponentKind, ComponentPatch, Port, PORT_SNAP_THRESHOLD};
use crate::config::{EditorConfig, ToolSettings};
use crate::drawing::ParsedDrawing;
use crate::entity::EntityId;
use crate::error::DrawingError;
use crate::geometry::PipeSegment;
use crate::history::{History, Snapshot};
use crate::math::{distance, Point3, EPSILON};
use crate::snap::{self, SnapCandidate, SnapSettings};
use serde::{Deserialize, Serialize};

/// 当前工具模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Select,
    DrawPipe,
    PlaceComponent(ComponentKind),
    Delete,
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Select => "Select",
            Mode::DrawPipe => "Pipe",
            Mode::PlaceComponent(kind) => kind.default_name(),
            Mode::Delete => "Delete",
        }
    }
}

/// 输入事件
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SetMode(Mode),
    /// 指针移动（世界坐标）
    PointerMoved(Point3),
    /// 指针点击（世界坐标），行为取决于当前模式
    Click(Point3),
    CompletePath,
    CancelPath,
    Select(Option<EntityId>),
    RemoveSegment(EntityId),
    RemoveComponent(EntityId),
    UpdateComponent(EntityId, ComponentPatch),
    Undo,
    Redo,
    ClearAll,
    SetDiameter(String),
    SetMaterial(String),
    SetSnapSettings(SnapSettings),
}

/// 持久化载荷：只有管段和元件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub segments: Vec<PipeSegment>,
    pub components: Vec<ComponentInstance>,
}

/// 交给渲染方的只读视图
#[derive(Debug, Clone, Copy)]
pub struct SessionView<'a> {
    pub mode: Mode,
    pub segments: &'a [PipeSegment],
    pub components: &'a [ComponentInstance],
    pub pending_points: &'a [Point3],
    pub current_snap: Option<&'a SnapCandidate>,
    pub hovered_port: Option<&'a Port>,
    pub selected: Option<EntityId>,
    pub blueprints: &'a [Blueprint],
}

/// 绘图会话
#[derive(Debug, Clone)]
pub struct DrawingSession {
    mode: Mode,
    segments: Vec<PipeSegment>,
    components: Vec<ComponentInstance>,
    /// 正在绘制的折线顶点
    pending: Vec<Point3>,
    selected: Option<EntityId>,
    history: History,
    snap: SnapSettings,
    tools: ToolSettings,
    current_snap: Option<SnapCandidate>,
    hovered_port: Option<Port>,
    blueprints: Vec<Blueprint>,
}

impl DrawingSession {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            mode: Mode::Select,
            segments: Vec::new(),
            components: Vec::new(),
            pending: Vec::new(),
            selected: None,
            history: History::new(config.history_limit, Snapshot::default()),
            snap: config.snap,
            tools: config.tools,
            current_snap: None,
            hovered_port: None,
            blueprints: Vec::new(),
        }
    }

    /// 从持久化数据恢复，历史从该状态开始
    pub fn from_data(data: SessionData, config: EditorConfig) -> Self {
        let mut session = Self::new(config);
        session.segments = data.segments;
        session.components = data.components;
        session.history.reset(session.snapshot());
        session
    }

    pub fn to_data(&self) -> SessionData {
        SessionData {
            segments: self.segments.clone(),
            components: self.components.clone(),
        }
    }

    // ========== 访问器 ==========

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn segments(&self) -> &[PipeSegment] {
        &self.segments
    }

    pub fn components(&self) -> &[ComponentInstance] {
        &self.components
    }

    pub fn pending_points(&self) -> &[Point3] {
        &self.pending
    }

    pub fn selected(&self) -> Option<EntityId> {
        self.selected
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn snap_settings(&self) -> &SnapSettings {
        &self.snap
    }

    pub fn tools(&self) -> &ToolSettings {
        &self.tools
    }

    pub fn current_snap(&self) -> Option<&SnapCandidate> {
        self.current_snap.as_ref()
    }

    pub fn blueprints(&self) -> &[Blueprint] {
        &self.blueprints
    }

    pub fn component(&self, id: EntityId) -> Option<&ComponentInstance> {
        self.components.iter().find(|c| c.id == id)
    }

    pub fn segment(&self, id: EntityId) -> Option<&PipeSegment> {
        self.segments.iter().find(|s| s.id() == id)
    }

    pub fn view(&self) -> SessionView<'_> {
        SessionView {
            mode: self.mode,
            segments: &self.segments,
            components: &self.components,
            pending_points: &self.pending,
            current_snap: self.current_snap.as_ref(),
            hovered_port: self.hovered_port.as_ref(),
            selected: self.selected,
            blueprints: &self.blueprints,
        }
    }

    // ========== 归约 ==========

    /// 纯归约：消费旧状态，返回新状态
    pub fn apply(mut self, event: SessionEvent) -> Self {
        self.dispatch(event);
        self
    }

    /// 就地处理一个事件
    pub fn dispatch(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::SetMode(mode) => self.set_mode(mode),
            SessionEvent::PointerMoved(p) => self.pointer_moved(p),
            SessionEvent::Click(p) => self.click(p),
            SessionEvent::CompletePath => {
                self.complete_pending_path();
            }
            SessionEvent::CancelPath => self.cancel_path(),
            SessionEvent::Select(id) => self.select(id),
            SessionEvent::RemoveSegment(id) => {
                self.remove_segment(id);
            }
            SessionEvent::RemoveComponent(id) => {
                self.remove_component(id);
            }
            SessionEvent::UpdateComponent(id, patch) => {
                self.update_component(id, patch);
            }
            SessionEvent::Undo => {
                self.undo();
            }
            SessionEvent::Redo => {
                self.redo();
            }
            SessionEvent::ClearAll => self.clear_all(),
            SessionEvent::SetDiameter(d) => self.tools.diameter = d,
            SessionEvent::SetMaterial(m) => self.tools.material = m,
            SessionEvent::SetSnapSettings(s) => self.snap = s,
        }
    }

    // ========== 模式与指针 ==========

    /// 切换模式，清空待定点和选择
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.pending.clear();
        self.selected = None;
    }

    /// 用当前几何和捕捉设置求解捕捉点
    pub fn resolve(&self, raw: Point3) -> (Point3, Option<SnapCandidate>) {
        snap::resolve(raw, &self.segments, &self.components, &self.snap)
    }

    /// 指针移动：更新捕捉反馈和悬停接口
    pub fn pointer_moved(&mut self, raw: Point3) {
        let (point, candidate) = self.resolve(raw);
        self.current_snap = candidate;
        self.hovered_port = find_nearby_port(&point, &self.components, PORT_SNAP_THRESHOLD);
    }

    /// 指针点击，按当前模式处理
    pub fn click(&mut self, raw: Point3) {
        match self.mode {
            Mode::DrawPipe => {
                self.add_pending_point(raw);
            }
            Mode::PlaceComponent(kind) => {
                self.place_component(kind, raw);
            }
            Mode::Select => {
                let hit = self.hit_test(&raw);
                self.select(hit);
            }
            Mode::Delete => match self.hit_test(&raw) {
                Some(id) if self.segment(id).is_some() => {
                    self.remove_segment(id);
                }
                Some(id) => {
                    self.remove_component(id);
                }
                None => {}
            },
        }
    }

    /// 捕捉后追加待定点，返回使用的捕捉候选
    ///
    /// 与上一个待定点重合的点被忽略。
    pub fn add_pending_point(&mut self, raw: Point3) -> Option<SnapCandidate> {
        let (point, candidate) = self.resolve(raw);
        if let Some(last) = self.pending.last() {
            if distance(last, &point) < EPSILON {
                return candidate;
            }
        }
        self.pending.push(point);
        candidate
    }

    pub fn cancel_path(&mut self) {
        self.pending.clear();
    }

    /// 距离点最近的元件或管段（捕捉半径内）
    pub fn hit_test(&self, point: &Point3) -> Option<EntityId> {
        let radius = self.snap.radius;
        let components = self
            .components
            .iter()
            .map(|c| (c.id, distance(point, &c.position)));
        let segments = self
            .segments
            .iter()
            .map(|s| (s.id(), s.distance_to_point(point)));

        components
            .chain(segments)
            .filter(|(_, d)| *d <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// 选择实体，不存在的 id 等同于清除选择
    pub fn select(&mut self, id: Option<EntityId>) {
        self.selected = id.filter(|id| self.segment(*id).is_some() || self.component(*id).is_some());
    }

    // ========== 结构性操作 ==========

    /// 把待定点提交为管段，返回新增管段数
    ///
    /// 少于两个待定点时什么也不做。整批管段只保存一次快照。
    pub fn complete_pending_path(&mut self) -> usize {
        if self.pending.len() < 2 {
            return 0;
        }

        let new_segments = complete_pending_path(&self.pending, &self.tools);
        self.pending.clear();

        let count = new_segments.len();
        if count > 0 {
            self.segments.extend(new_segments);
            self.save_snapshot();
            tracing::debug!(count, total = self.segments.len(), "completed pipe path");
        }
        count
    }

    pub fn add_component(&mut self, component: ComponentInstance) -> EntityId {
        let id = component.id;
        self.components.push(component);
        self.save_snapshot();
        tracing::debug!(%id, "added component");
        id
    }

    /// 在捕捉后的位置放置元件
    pub fn place_component(&mut self, kind: ComponentKind, raw: Point3) -> EntityId {
        let (point, _) = self.resolve(raw);
        self.add_component(ComponentInstance::new(kind, point))
    }

    pub fn remove_segment(&mut self, id: EntityId) -> bool {
        let before = self.segments.len();
        self.segments.retain(|s| s.id() != id);
        if self.segments.len() == before {
            return false;
        }
        if self.selected == Some(id) {
            self.selected = None;
        }
        self.clear_feedback();
        self.save_snapshot();
        tracing::debug!(%id, "removed segment");
        true
    }

    pub fn remove_component(&mut self, id: EntityId) -> bool {
        let before = self.components.len();
        self.components.retain(|c| c.id != id);
        if self.components.len() == before {
            return false;
        }
        if self.selected == Some(id) {
            self.selected = None;
        }
        self.clear_feedback();
        self.save_snapshot();
        tracing::debug!(%id, "removed component");
        true
    }

    /// 原地修改元件属性
    ///
    /// 同一元件的连续修改合并为一个撤销步骤。
    pub fn update_component(&mut self, id: EntityId, patch: ComponentPatch) -> bool {
        let Some(component) = self.components.iter_mut().find(|c| c.id == id) else {
            return false;
        };
        component.apply(patch);
        let snapshot = self.snapshot();
        self.history.save_coalesced(id, snapshot);
        true
    }

    /// 清空一切并回到选择模式
    pub fn clear_all(&mut self) {
        self.segments.clear();
        self.components.clear();
        self.pending.clear();
        self.selected = None;
        self.clear_feedback();
        self.mode = Mode::Select;
        self.save_snapshot();
        tracing::debug!("cleared session");
    }

    // ========== 历史 ==========

    fn snapshot(&self) -> Snapshot {
        Snapshot::new(&self.segments, &self.components)
    }

    pub fn save_snapshot(&mut self) {
        let snapshot = self.snapshot();
        self.history.save(snapshot);
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.segments = snapshot.segments;
        self.components = snapshot.components;
        if let Some(id) = self.selected {
            self.select(Some(id));
        }
        self.clear_feedback();
    }

    /// 清除捕捉和悬停反馈，几何变化后必须调用
    fn clear_feedback(&mut self) {
        self.current_snap = None;
        self.hovered_port = None;
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    // ========== 底图 ==========

    /// 合并导入的图纸，一步同步完成
    pub fn import_drawing(&mut self, name: impl Into<String>, drawing: ParsedDrawing) -> EntityId {
        let blueprint = Blueprint::new(name, drawing);
        let id = blueprint.id;
        tracing::info!(
            %id,
            name = %blueprint.name,
            entities = blueprint.drawing.entities.len(),
            "imported drawing"
        );
        self.blueprints.push(blueprint);
        id
    }

    pub fn remove_blueprint(&mut self, id: EntityId) -> bool {
        let before = self.blueprints.len();
        self.blueprints.retain(|b| b.id != id);
        self.blueprints.len() != before
    }

    pub fn blueprint(&self, id: EntityId) -> Option<&Blueprint> {
        self.blueprints.iter().find(|b| b.id == id)
    }

    fn blueprint_mut(&mut self, id: EntityId) -> Result<&mut Blueprint, DrawingError> {
        self.blueprints
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(DrawingError::BlueprintNotFound(id))
    }

    fn unlocked_blueprint_mut(&mut self, id: EntityId) -> Result<&mut Blueprint, DrawingError> {
        let blueprint = self.blueprint_mut(id)?;
        if blueprint.locked {
            return Err(DrawingError::BlueprintLocked(id));
        }
        Ok(blueprint)
    }

    pub fn toggle_blueprint_visibility(&mut self, id: EntityId) -> Result<bool, DrawingError> {
        let blueprint = self.blueprint_mut(id)?;
        blueprint.visible = !blueprint.visible;
        Ok(blueprint.visible)
    }

    pub fn toggle_blueprint_lock(&mut self, id: EntityId) -> Result<bool, DrawingError> {
        let blueprint = self.blueprint_mut(id)?;
        blueprint.locked = !blueprint.locked;
        Ok(blueprint.locked)
    }

    /// 设置不透明度，限制在 0.0 ~ 1.0
    pub fn set_blueprint_opacity(&mut self, id: EntityId, opacity: f32) -> Result<(), DrawingError> {
        self.blueprint_mut(id)?.opacity = opacity.clamp(0.0, 1.0);
        Ok(())
    }

    pub fn set_blueprint_layer_visible(
        &mut self,
        id: EntityId,
        layer: &str,
        visible: bool,
    ) -> Result<bool, DrawingError> {
        Ok(self.blueprint_mut(id)?.drawing.set_layer_visible(layer, visible))
    }

    pub fn scale_drawing(&mut self, id: EntityId, factor: f64) -> Result<(), DrawingError> {
        let blueprint = self.unlocked_blueprint_mut(id)?;
        blueprint.drawing = blueprint.drawing.scaled(factor)?;
        Ok(())
    }

    pub fn center_drawing(&mut self, id: EntityId) -> Result<(), DrawingError> {
        let blueprint = self.unlocked_blueprint_mut(id)?;
        blueprint.drawing = blueprint.drawing.centered();
        Ok(())
    }
}

impl Default for DrawingSession {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}
