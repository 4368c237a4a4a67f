//! 字节流分帧状态机
//!
//! 串口上除了协议帧外，设备还会输出调试文本（"chatter"）。状态机在等待起始字节时
//! 把所有其它字节作为 chatter 交给调用方；遇到非法响应码或长度时丢弃当前帧并回到
//! 等待起始字节状态。非法字节本身被消费，不会作为新帧起点重新检查。
//!
//! ```text
//! WaitAlert --marker--> WaitResponseCode --1..=127--> WaitLength
//! WaitLength --0--> (帧完成) WaitAlert
//! WaitLength --1..=10--> WaitPayload --满--> (帧完成) WaitAlert
//! ```

use crate::{FRAME_CAPACITY, HEADER_ALERT_BYTE, HEADER_RESPONSE_BYTE, HEADER_SIZE, MAX_MESSAGE_SIZE, UarmFrame};

/// 接收状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiveState {
    #[default]
    WaitAlert,
    WaitResponseCode,
    WaitLength,
    WaitPayload,
}

/// 丢弃原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// 响应码按有符号字节解释不在 1..=127
    InvalidCode(u8),
    /// 长度按有符号字节解释不在 0..=10
    InvalidLength(u8),
}

/// 单字节输入产生的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseEvent {
    /// 完整帧
    Frame(UarmFrame),
    /// 帧外的调试输出字节
    Chatter(u8),
    /// 当前帧被丢弃，状态机已复位
    Discarded(DiscardReason),
}

/// 分帧状态机
///
/// ```rust
/// use uarm_protocol::FrameParser;
///
/// let mut parser = FrameParser::for_responses();
/// let frames: Vec<_> = parser
///     .feed(b"ok\n\xBB\x03\x06\x00\x32\x01\x16\x00\x3C")
///     .frames()
///     .collect();
/// assert_eq!(frames.len(), 1);
/// assert_eq!(frames[0].payload(), &[0x00, 0x32, 0x01, 0x16, 0x00, 0x3C]);
/// ```
#[derive(Debug, Clone)]
pub struct FrameParser {
    marker: u8,
    state: ReceiveState,
    buffer: [u8; FRAME_CAPACITY],
    filled: usize,
    expected: usize,
}

impl FrameParser {
    /// 指定起始字节
    pub fn with_marker(marker: u8) -> Self {
        Self {
            marker,
            state: ReceiveState::WaitAlert,
            buffer: [0u8; FRAME_CAPACITY],
            filled: 0,
            expected: 0,
        }
    }

    /// 主机侧：解析设备响应（0xBB）
    pub fn for_responses() -> Self {
        Self::with_marker(HEADER_RESPONSE_BYTE)
    }

    /// 设备侧：解析主机命令（0xAA）
    pub fn for_commands() -> Self {
        Self::with_marker(HEADER_ALERT_BYTE)
    }

    pub fn state(&self) -> ReceiveState {
        self.state
    }

    /// 下一次读取最多应请求的字节数
    ///
    /// 等待负载时为剩余负载长度，否则为 1。
    pub fn wanted(&self) -> usize {
        match self.state {
            ReceiveState::WaitPayload => self.expected - self.filled,
            _ => 1,
        }
    }

    /// 丢弃部分帧，回到 WaitAlert
    pub fn reset(&mut self) {
        self.state = ReceiveState::WaitAlert;
        self.filled = 0;
        self.expected = 0;
    }

    /// 输入一个字节
    ///
    /// 返回 `None` 表示字节已并入未完成的帧。
    pub fn push(&mut self, byte: u8) -> Option<ParseEvent> {
        match self.state {
            ReceiveState::WaitAlert => {
                if byte == self.marker {
                    self.buffer = [0u8; FRAME_CAPACITY];
                    self.buffer[0] = byte;
                    self.state = ReceiveState::WaitResponseCode;
                    None
                } else {
                    Some(ParseEvent::Chatter(byte))
                }
            },
            ReceiveState::WaitResponseCode => {
                if (byte as i8) > 0 {
                    self.buffer[1] = byte;
                    self.state = ReceiveState::WaitLength;
                    None
                } else {
                    self.reset();
                    Some(ParseEvent::Discarded(DiscardReason::InvalidCode(byte)))
                }
            },
            ReceiveState::WaitLength => {
                let length = byte as i8;
                if length == 0 {
                    self.buffer[2] = 0;
                    let frame = UarmFrame::from_buffer(self.buffer, HEADER_SIZE);
                    self.reset();
                    Some(ParseEvent::Frame(frame))
                } else if length > 0 && (length as usize) <= MAX_MESSAGE_SIZE {
                    self.buffer[2] = byte;
                    self.expected = length as usize;
                    self.filled = 0;
                    self.state = ReceiveState::WaitPayload;
                    None
                } else {
                    self.reset();
                    Some(ParseEvent::Discarded(DiscardReason::InvalidLength(byte)))
                }
            },
            ReceiveState::WaitPayload => {
                self.buffer[HEADER_SIZE + self.filled] = byte;
                self.filled += 1;
                if self.filled == self.expected {
                    let frame = UarmFrame::from_buffer(self.buffer, HEADER_SIZE + self.expected);
                    self.reset();
                    Some(ParseEvent::Frame(frame))
                } else {
                    None
                }
            },
        }
    }

    /// 输入一段字节，返回惰性事件迭代器
    pub fn feed<'p, 'b>(&'p mut self, bytes: &'b [u8]) -> Feed<'p, 'b> {
        Feed {
            parser: self,
            bytes: bytes.iter(),
        }
    }
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::for_responses()
    }
}

/// [`FrameParser::feed`] 返回的事件迭代器
pub struct Feed<'p, 'b> {
    parser: &'p mut FrameParser,
    bytes: std::slice::Iter<'b, u8>,
}

impl<'p, 'b> Feed<'p, 'b> {
    /// 只保留完整帧
    pub fn frames(self) -> impl Iterator<Item = UarmFrame> {
        self.filter_map(|event| match event {
            ParseEvent::Frame(frame) => Some(frame),
            _ => None,
        })
    }
}

impl Iterator for Feed<'_, '_> {
    type Item = ParseEvent;

    fn next(&mut self) -> Option<ParseEvent> {
        for &byte in self.bytes.by_ref() {
            if let Some(event) = self.parser.push(byte) {
                return Some(event);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(parser: &mut FrameParser, bytes: &[u8]) -> Vec<ParseEvent> {
        parser.feed(bytes).collect()
    }

    #[test]
    fn test_header_only_frame() {
        let mut parser = FrameParser::for_responses();
        // 逐字节输入：3 字节帧头之后跟 4 个尾随字节
        let ev: Vec<ParseEvent> = [0xBB, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00]
            .into_iter()
            .filter_map(|b| parser.push(b))
            .collect();

        let frames: Vec<_> = ev
            .iter()
            .filter_map(|e| match e {
                ParseEvent::Frame(f) => Some(*f),
                _ => None,
            })
            .collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].code(), 0x01);
        assert!(frames[0].payload().is_empty());
        assert!(matches!(ev[0], ParseEvent::Frame(_)));

        // 尾随字节只是帧外输出，不产生第二帧或丢弃事件
        assert!(ev[1..].iter().all(|e| matches!(e, ParseEvent::Chatter(_))));
        assert!(!ev.iter().any(|e| matches!(e, ParseEvent::Discarded(_))));
        assert_eq!(parser.state(), ReceiveState::WaitAlert);
    }

    #[test]
    fn test_chatter_before_frame() {
        let mut parser = FrameParser::for_responses();
        let ev = events(&mut parser, b"hi\xBB\x02\x03\x01\x07\x04");
        assert_eq!(ev[0], ParseEvent::Chatter(b'h'));
        assert_eq!(ev[1], ParseEvent::Chatter(b'i'));
        let ParseEvent::Frame(frame) = ev[2] else {
            panic!("expected frame");
        };
        assert_eq!(frame.as_bytes(), &[0xBB, 0x02, 0x03, 0x01, 0x07, 0x04]);
    }

    #[test]
    fn test_invalid_length_resyncs() {
        let mut parser = FrameParser::for_responses();
        let ev = events(
            &mut parser,
            &[0xBB, 0x03, 0x0B, 0xBB, 0x03, 0x06, 0, 50, 1, 22, 0, 60],
        );
        assert_eq!(ev[0], ParseEvent::Discarded(DiscardReason::InvalidLength(0x0B)));
        assert_eq!(ev.len(), 2);
        let ParseEvent::Frame(frame) = ev[1] else {
            panic!("expected frame");
        };
        assert_eq!(frame.payload(), &[0, 50, 1, 22, 0, 60]);
    }

    /// 按有符号解释，0x80..=0xFF 的长度为负
    #[test]
    fn test_negative_length_rejected() {
        let mut parser = FrameParser::for_responses();
        let ev = events(&mut parser, &[0xBB, 0x03, 0x85]);
        assert_eq!(ev, vec![ParseEvent::Discarded(DiscardReason::InvalidLength(0x85))]);
        assert_eq!(parser.state(), ReceiveState::WaitAlert);
    }

    #[test]
    fn test_invalid_code_is_consumed() {
        let mut parser = FrameParser::for_responses();
        // 0xBB 作为响应码无效（负数），被消费后不作为新的起始字节
        let ev = events(&mut parser, &[0xBB, 0xBB, 0x01, 0x00]);
        assert_eq!(ev[0], ParseEvent::Discarded(DiscardReason::InvalidCode(0xBB)));
        assert_eq!(ev[1], ParseEvent::Chatter(0x01));
        assert_eq!(ev[2], ParseEvent::Chatter(0x00));

        let ev = events(&mut parser, &[0xBB, 0x00]);
        assert_eq!(ev, vec![ParseEvent::Discarded(DiscardReason::InvalidCode(0x00))]);
    }

    #[test]
    fn test_max_payload() {
        let mut parser = FrameParser::for_responses();
        let mut bytes = vec![0xBB, 0x7F, 0x0A];
        bytes.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        let frames: Vec<_> = parser.feed(&bytes).frames().collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].code(), 0x7F);
        assert_eq!(frames[0].payload().len(), 10);
    }

    #[test]
    fn test_wanted_tracks_payload() {
        let mut parser = FrameParser::for_responses();
        assert_eq!(parser.wanted(), 1);
        parser.push(0xBB);
        parser.push(0x03);
        assert_eq!(parser.wanted(), 1);
        parser.push(0x06);
        assert_eq!(parser.state(), ReceiveState::WaitPayload);
        assert_eq!(parser.wanted(), 6);
        parser.push(0x00);
        parser.push(0x01);
        assert_eq!(parser.wanted(), 4);
    }

    #[test]
    fn test_split_across_feeds() {
        let mut parser = FrameParser::for_responses();
        assert!(events(&mut parser, &[0xBB, 0x02]).is_empty());
        assert!(events(&mut parser, &[0x03, 0x00]).is_empty());
        let frames: Vec<_> = parser.feed(&[0x0E, 0x08]).frames().collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload(), &[0x00, 0x0E, 0x08]);
    }

    #[test]
    fn test_command_marker_is_chatter_for_response_parser() {
        let mut parser = FrameParser::for_responses();
        let ev = events(&mut parser, &[0xAA, 0x06, 0x00]);
        assert_eq!(ev.len(), 3);
        assert!(ev.iter().all(|e| matches!(e, ParseEvent::Chatter(_))));
    }

    #[test]
    fn test_reset_drops_partial_frame() {
        let mut parser = FrameParser::for_responses();
        parser.push(0xBB);
        parser.push(0x03);
        parser.reset();
        assert_eq!(parser.state(), ReceiveState::WaitAlert);
        assert_eq!(parser.push(0x41), Some(ParseEvent::Chatter(0x41)));
    }
}
